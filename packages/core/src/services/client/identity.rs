//! Users, teams, roles, role assignments and projects

use super::Client;
use crate::filters::{Page, QueryFilter, QueryParams};
use crate::models::{
    Permission, Project, ProjectRequest, ProjectUpdate, Resource, Role, RoleAssignment,
    RoleAssignmentRequest, RoleRequest, RoleUpdate, Team, TeamRequest, TeamUpdate, User,
    UserRequest, UserUpdate,
};
use crate::services::error::ClientError;
use crate::services::resolver::EntityRef;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Who a role is assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignee<'a> {
    User(&'a str),
    Team(&'a str),
}

/// Parse permission names, skipping unknown ones
fn parse_permissions(names: &[&str]) -> BTreeSet<Permission> {
    names
        .iter()
        .filter_map(|name| match name.parse::<Permission>() {
            Ok(permission) => Some(permission),
            Err(_) => {
                tracing::warn!("Ignoring unknown permission '{}'", name);
                None
            }
        })
        .collect()
}

impl Client {
    // ----- //
    // USERS //
    // ----- //

    /// Create a user, optionally assigning it a role right away
    pub async fn create_user(
        &self,
        request: UserRequest,
        initial_role: Option<&str>,
    ) -> Result<User, ClientError> {
        if self.name_taken::<User>(&request.name, Vec::new(), None).await? {
            return Err(ClientError::already_exists(format!(
                "A user with name '{}' already exists.",
                request.name
            )));
        }
        let user: User = self.create_entity(request).await?;
        if let Some(role) = initial_role {
            self.create_role_assignment(role, Assignee::User(&user.name), None)
                .await?;
        }
        Ok(user)
    }

    pub async fn get_user<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<User, ClientError> {
        self.get_entity(reference).await
    }

    pub async fn list_users(&self, params: &QueryParams) -> Result<Page<User>, ClientError> {
        self.list_entities(params).await
    }

    pub async fn update_user<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
        update: UserUpdate,
    ) -> Result<User, ClientError> {
        let user: User = self.get_entity(reference).await?;
        if let Some(name) = &update.name {
            if self.name_taken::<User>(name, Vec::new(), Some(user.id)).await? {
                return Err(ClientError::already_exists(format!(
                    "A user with name '{}' already exists.",
                    name
                )));
            }
        }
        self.update_entity(user.id, update).await
    }

    /// Delete a user; the active user cannot delete itself
    pub async fn delete_user<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<(), ClientError> {
        let user: User = self.get_entity(reference).await?;
        if self.active_user().await?.id == user.id {
            return Err(ClientError::illegal_operation(
                "You cannot delete the user account you are currently logged in as.",
            ));
        }
        self.delete_entity(&user).await
    }

    // ----- //
    // TEAMS //
    // ----- //

    async fn resolve_users(&self, references: &[&str]) -> Result<Vec<Uuid>, ClientError> {
        let mut ids = Vec::with_capacity(references.len());
        for reference in references {
            let user: User = self.get_entity(*reference).await?;
            if !ids.contains(&user.id) {
                ids.push(user.id);
            }
        }
        Ok(ids)
    }

    /// Create a team from user names, ids or id prefixes
    pub async fn create_team(&self, name: &str, users: &[&str]) -> Result<Team, ClientError> {
        if self.name_taken::<Team>(name, Vec::new(), None).await? {
            return Err(ClientError::already_exists(format!(
                "A team with name '{}' already exists.",
                name
            )));
        }
        let users = self.resolve_users(users).await?;
        self.create_entity(TeamRequest {
            name: name.to_string(),
            users,
        })
        .await
    }

    pub async fn get_team<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<Team, ClientError> {
        self.get_entity(reference).await
    }

    pub async fn list_teams(&self, params: &QueryParams) -> Result<Page<Team>, ClientError> {
        self.list_entities(params).await
    }

    /// Rename a team and add or remove members
    pub async fn update_team<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
        new_name: Option<&str>,
        add_users: &[&str],
        remove_users: &[&str],
    ) -> Result<Team, ClientError> {
        let team: Team = self.get_entity(reference).await?;
        let added = self.resolve_users(add_users).await?;
        let removed = self.resolve_users(remove_users).await?;
        if added.iter().any(|id| removed.contains(id)) {
            return Err(ClientError::validation(
                "The same user cannot be added to and removed from a team in one update.",
            ));
        }

        let mut update = TeamUpdate::default();
        if let Some(name) = new_name {
            if self.name_taken::<Team>(name, Vec::new(), Some(team.id)).await? {
                return Err(ClientError::already_exists(format!(
                    "A team with name '{}' already exists.",
                    name
                )));
            }
            update.name = Some(name.to_string());
        }
        if !added.is_empty() || !removed.is_empty() {
            let mut users: Vec<Uuid> = team
                .users
                .iter()
                .copied()
                .filter(|id| !removed.contains(id))
                .collect();
            for id in added {
                if !users.contains(&id) {
                    users.push(id);
                }
            }
            update.users = Some(users);
        }
        self.update_entity(team.id, update).await
    }

    pub async fn delete_team<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<(), ClientError> {
        let team: Team = self.get_entity(reference).await?;
        self.delete_entity(&team).await
    }

    // ----- //
    // ROLES //
    // ----- //

    /// Create a role; unknown permission names are ignored with a warning
    pub async fn create_role(&self, name: &str, permissions: &[&str]) -> Result<Role, ClientError> {
        if self.name_taken::<Role>(name, Vec::new(), None).await? {
            return Err(ClientError::already_exists(format!(
                "A role with name '{}' already exists.",
                name
            )));
        }
        self.create_entity(RoleRequest {
            name: name.to_string(),
            permissions: parse_permissions(permissions),
        })
        .await
    }

    pub async fn get_role<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<Role, ClientError> {
        self.get_entity(reference).await
    }

    pub async fn list_roles(&self, params: &QueryParams) -> Result<Page<Role>, ClientError> {
        self.list_entities(params).await
    }

    pub async fn update_role<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
        new_name: Option<&str>,
        add_permissions: &[&str],
        remove_permissions: &[&str],
    ) -> Result<Role, ClientError> {
        let role: Role = self.get_entity(reference).await?;
        let added = parse_permissions(add_permissions);
        let removed = parse_permissions(remove_permissions);
        if !added.is_disjoint(&removed) {
            return Err(ClientError::validation(
                "The same permission cannot be added to and removed from a role in one update.",
            ));
        }

        let mut update = RoleUpdate::default();
        if let Some(name) = new_name {
            if self.name_taken::<Role>(name, Vec::new(), Some(role.id)).await? {
                return Err(ClientError::already_exists(format!(
                    "A role with name '{}' already exists.",
                    name
                )));
            }
            update.name = Some(name.to_string());
        }
        if !added.is_empty() || !removed.is_empty() {
            let permissions = role
                .permissions
                .union(&added)
                .filter(|permission| !removed.contains(*permission))
                .copied()
                .collect();
            update.permissions = Some(permissions);
        }
        self.update_entity(role.id, update).await
    }

    pub async fn delete_role<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<(), ClientError> {
        let role: Role = self.get_entity(reference).await?;
        self.delete_entity(&role).await
    }

    // ---------------- //
    // ROLE ASSIGNMENTS //
    // ---------------- //

    /// Assign a role to a user or team, optionally limited to one project
    pub async fn create_role_assignment(
        &self,
        role: &str,
        assignee: Assignee<'_>,
        project: Option<&str>,
    ) -> Result<RoleAssignment, ClientError> {
        let role: Role = self.get_entity(role).await?;
        let (user, team) = match assignee {
            Assignee::User(reference) => {
                let user: User = self.get_entity(reference).await?;
                (Some(user.id), None)
            }
            Assignee::Team(reference) => {
                let team: Team = self.get_entity(reference).await?;
                (None, Some(team.id))
            }
        };
        let project = match project {
            Some(reference) => {
                let project: Project = self.get_entity(reference).await?;
                Some(project.id)
            }
            None => None,
        };
        self.create_entity(RoleAssignmentRequest {
            role: role.id,
            user,
            team,
            project,
        })
        .await
    }

    /// Role assignments can only be addressed by id or id prefix
    pub async fn get_role_assignment<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<RoleAssignment, ClientError> {
        self.get_entity(reference).await
    }

    pub async fn list_role_assignments(
        &self,
        params: &QueryParams,
    ) -> Result<Page<RoleAssignment>, ClientError> {
        self.list_entities(params).await
    }

    pub async fn delete_role_assignment<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<(), ClientError> {
        let assignment: RoleAssignment = self.get_entity(reference).await?;
        self.delete_entity(&assignment).await
    }

    // -------- //
    // PROJECTS //
    // -------- //

    pub async fn create_project(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Project, ClientError> {
        if self.name_taken::<Project>(name, Vec::new(), None).await? {
            return Err(ClientError::already_exists(format!(
                "A project with name '{}' already exists.",
                name
            )));
        }
        self.create_entity(ProjectRequest {
            name: name.to_string(),
            description: description.to_string(),
        })
        .await
    }

    /// Resolve a project; `None` returns the active project
    pub async fn get_project(&self, reference: Option<&str>) -> Result<Project, ClientError> {
        match reference {
            Some(reference) => self.get_entity(reference).await,
            None => self.active_project().await,
        }
    }

    pub async fn list_projects(&self, params: &QueryParams) -> Result<Page<Project>, ClientError> {
        self.list_entities(params).await
    }

    pub async fn update_project<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
        update: ProjectUpdate,
    ) -> Result<Project, ClientError> {
        let project: Project = self.get_entity(reference).await?;
        if let Some(name) = &update.name {
            if self.name_taken::<Project>(name, Vec::new(), Some(project.id)).await? {
                return Err(ClientError::already_exists(format!(
                    "A project with name '{}' already exists.",
                    name
                )));
            }
        }
        self.update_entity(project.id, update).await
    }

    /// Delete a project that is not active in any configuration
    pub async fn delete_project<'a>(
        &self,
        reference: impl Into<EntityRef<'a>>,
    ) -> Result<(), ClientError> {
        let project: Project = self.get_entity(reference).await?;
        if self.is_project_active_anywhere(project.id) {
            return Err(ClientError::illegal_operation(format!(
                "Project '{}' cannot be deleted while it is active. Please set another project \
                 active first.",
                project.name
            )));
        }
        self.delete_entity(&project).await
    }

    /// Role assignments held by a user, directly or through a team
    pub async fn user_role_assignments(
        &self,
        user: &User,
    ) -> Result<Vec<RoleAssignment>, ClientError> {
        let mut assignments = self
            .collect_all::<RoleAssignment>(vec![QueryFilter::uuid_equals("user", user.id)])
            .await?;
        let teams = self.collect_all::<Team>(Vec::new()).await?;
        for team in teams.iter().filter(|team| team.users.contains(&user.id)) {
            assignments.extend(
                self.collect_all::<RoleAssignment>(vec![QueryFilter::uuid_equals(
                    "team",
                    team.id(),
                )])
                .await?,
            );
        }
        Ok(assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::services::ClientSettings;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn client(dir: &TempDir) -> Client {
        let settings = ClientSettings {
            repository_path: Some(dir.path().join("missing")),
            global_config_path: Some(dir.path().to_path_buf()),
            enable_repo_init_warnings: false,
        };
        Client::new(Arc::new(InMemoryStore::new()), settings)
            .await
            .unwrap()
    }

    fn user(name: &str) -> UserRequest {
        UserRequest {
            name: name.to_string(),
            full_name: String::new(),
            email: None,
            password: None,
            active: true,
        }
    }

    #[test]
    fn test_unknown_permissions_are_ignored() {
        let permissions = parse_permissions(&["read", "fly", "me"]);
        assert_eq!(
            permissions.into_iter().collect::<Vec<_>>(),
            vec![Permission::Read, Permission::Me]
        );
    }

    #[tokio::test]
    async fn test_active_user_cannot_delete_itself() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;

        let err = client.delete_user("default").await.unwrap_err();
        assert!(matches!(err, ClientError::IllegalOperation(_)));

        client.create_user(user("aria"), None).await.unwrap();
        client.delete_user("aria").await.unwrap();
        assert!(client.get_user("aria").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_user_rejected() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        client.create_user(user("aria"), None).await.unwrap();
        assert!(matches!(
            client.create_user(user("aria"), None).await,
            Err(ClientError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_team_membership_updates() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        let aria = client.create_user(user("aria"), None).await.unwrap();
        let blake = client.create_user(user("blake"), None).await.unwrap();

        let team = client.create_team("platform", &["aria"]).await.unwrap();
        assert_eq!(team.users, vec![aria.id]);

        let team = client
            .update_team("platform", Some("infra"), &["blake"], &["aria"])
            .await
            .unwrap();
        assert_eq!(team.name, "infra");
        assert_eq!(team.users, vec![blake.id]);

        let err = client
            .update_team("infra", None, &["aria"], &["aria"])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn test_role_permissions_update() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        client.create_role("viewer", &["read"]).await.unwrap();

        let role = client
            .update_role("viewer", Some("editor"), &["write"], &[])
            .await
            .unwrap();
        assert_eq!(role.name, "editor");
        assert!(role.permissions.contains(&Permission::Write));
        assert!(role.permissions.contains(&Permission::Read));

        let role = client.update_role("editor", None, &[], &["read"]).await.unwrap();
        assert_eq!(
            role.permissions.into_iter().collect::<Vec<_>>(),
            vec![Permission::Write]
        );
    }

    #[tokio::test]
    async fn test_initial_role_and_team_assignments() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;
        client.create_role("admin", &["read", "write"]).await.unwrap();
        client.create_role("viewer", &["read"]).await.unwrap();

        let aria = client.create_user(user("aria"), Some("admin")).await.unwrap();
        client.create_team("platform", &["aria"]).await.unwrap();
        client
            .create_role_assignment("viewer", Assignee::Team("platform"), Some("default"))
            .await
            .unwrap();

        let assignments = client.user_role_assignments(&aria).await.unwrap();
        assert_eq!(assignments.len(), 2);
        assert!(assignments.iter().any(|a| a.user == Some(aria.id)));
        assert!(assignments.iter().any(|a| a.team.is_some() && a.project.is_some()));
    }

    #[tokio::test]
    async fn test_active_project_cannot_be_deleted() {
        let dir = TempDir::new().unwrap();
        let client = client(&dir).await;

        let err = client.delete_project("default").await.unwrap_err();
        assert!(matches!(err, ClientError::IllegalOperation(_)));

        client.create_project("research", "").await.unwrap();
        client.delete_project("research").await.unwrap();
    }
}
