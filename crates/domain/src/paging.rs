//! Paging and sorting for order listings.
//!
//! Sortable fields are a closed enum; raw field names never reach a store.

use serde::{Deserialize, Serialize};

use crate::error::PagingError;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSortField {
    #[default]
    Id,
    CreatedAt,
    TotalAmount,
    Status,
}

impl std::str::FromStr for OrderSortField {
    type Err = PagingError;

    /// Accepts both snake_case and the camelCase names older clients send.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "created_at" | "createdAt" => Ok(Self::CreatedAt),
            "total_amount" | "totalAmount" => Ok(Self::TotalAmount),
            "status" => Ok(Self::Status),
            other => Err(PagingError::UnknownSortField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = PagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(PagingError::UnknownSortDirection(s.to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderSort {
    pub field: OrderSortField,
    pub direction: SortDirection,
}

/// A zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    size: u32,
    sort: OrderSort,
}

impl PageRequest {
    /// Creates a page request; `size` must be within `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, size: u32, sort: OrderSort) -> Result<Self, PagingError> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(PagingError::InvalidPageSize(size));
        }
        Ok(Self { page, size, sort })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn sort(&self) -> OrderSort {
        self.sort
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: 10,
            sort: OrderSort::default(),
        }
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_pages: u64,
    pub total_elements: u64,
    pub last: bool,
}

impl<T> Page<T> {
    /// Assembles a page from its content and the total row count.
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size());
        let total_pages = total_elements.div_ceil(size);
        Self {
            content,
            page: request.page(),
            size: request.size(),
            total_pages,
            total_elements,
            last: u64::from(request.page()) + 1 >= total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_pages: self.total_pages,
            total_elements: self.total_elements,
            last: self.last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_parsing() {
        assert_eq!("id".parse::<OrderSortField>().unwrap(), OrderSortField::Id);
        assert_eq!(
            "createdAt".parse::<OrderSortField>().unwrap(),
            OrderSortField::CreatedAt
        );
        assert_eq!(
            "total_amount".parse::<OrderSortField>().unwrap(),
            OrderSortField::TotalAmount
        );
        assert!(matches!(
            "password; DROP TABLE orders".parse::<OrderSortField>(),
            Err(PagingError::UnknownSortField(_))
        ));
    }

    #[test]
    fn test_sort_direction_is_case_insensitive() {
        assert_eq!("DESC".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert!("sideways".parse::<SortDirection>().is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(PageRequest::new(0, 0, OrderSort::default()).is_err());
        assert!(PageRequest::new(0, MAX_PAGE_SIZE + 1, OrderSort::default()).is_err());
        assert_eq!(
            PageRequest::new(3, 20, OrderSort::default()).unwrap().offset(),
            60
        );
    }

    #[test]
    fn test_page_totals() {
        let request = PageRequest::new(1, 10, OrderSort::default()).unwrap();
        let page = Page::new(vec![1, 2, 3], &request, 13);
        assert_eq!(page.total_pages, 2);
        assert!(page.last);

        let first = PageRequest::new(0, 10, OrderSort::default()).unwrap();
        let page = Page::new(vec![0; 10], &first, 13);
        assert!(!page.last);

        let empty = Page::<u8>::new(vec![], &first, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(empty.last);
    }
}
