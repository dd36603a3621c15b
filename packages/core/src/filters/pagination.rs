//! Pagination parameters and result pages

use super::error::FilterError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Validated `{page, size}` pair
///
/// Invariants: `page >= 1` and `1 <= size <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    page: u32,
    size: u32,
}

impl Pagination {
    pub fn new(page: i64, size: i64) -> Result<Self, FilterError> {
        if page < 1 || page > u32::MAX as i64 {
            return Err(FilterError::PageOutOfRange { page });
        }
        if size < 1 || size > MAX_PAGE_SIZE as i64 {
            return Err(FilterError::SizeOutOfRange { size });
        }
        Ok(Self {
            page: page as u32,
            size: size as u32,
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn limit(&self) -> usize {
        self.size as usize
    }

    pub fn offset(&self) -> usize {
        self.size as usize * (self.page as usize - 1)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of list results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of matching entities across all pages
    pub total: usize,
    pub page: u32,
    pub size: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(self.size as usize)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
        }
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_offset() {
        let pagination = Pagination::new(3, 20).unwrap();
        assert_eq!(pagination.limit(), 20);
        assert_eq!(pagination.offset(), 40);

        let first = Pagination::default();
        assert_eq!((first.page(), first.size()), (1, 50));
        assert_eq!(first.offset(), 0);
    }

    #[test]
    fn test_bounds() {
        assert!(Pagination::new(1, 100).is_ok());
        assert!(Pagination::new(1, 1).is_ok());
        assert_eq!(
            Pagination::new(1, 101).unwrap_err(),
            FilterError::SizeOutOfRange { size: 101 }
        );
        assert_eq!(
            Pagination::new(1, 0).unwrap_err(),
            FilterError::SizeOutOfRange { size: 0 }
        );
        assert_eq!(
            Pagination::new(0, 50).unwrap_err(),
            FilterError::PageOutOfRange { page: 0 }
        );
    }

    #[test]
    fn test_total_pages() {
        let page: Page<u8> = Page {
            items: vec![],
            total: 101,
            page: 1,
            size: 50,
        };
        assert_eq!(page.total_pages(), 3);
    }
}
