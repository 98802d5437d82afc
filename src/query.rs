//! Validation layer for list-endpoint query parameters.
//!
//! Everything here runs before any SQL is built: sort direction and sort
//! column are checked against fixed literals, page numbers must parse as
//! positive integers. The validated values (not the client strings) are what
//! the store implementations interpolate, so a query can never carry a
//! client-controlled identifier.

use crate::repo::RepoError;

/// Columns the articles list may be sorted by. `comment_count` is the
/// derived aggregate; everything else is a real `articles` column.
pub const ARTICLE_SORT_COLUMNS: &[&str] = &[
    "article_id",
    "author",
    "title",
    "topic",
    "created_at",
    "votes",
    "article_img_url",
    "comment_count",
];

pub const DEFAULT_SORT_COLUMN: &str = "created_at";
pub const DEFAULT_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Accepts only the two exact literals; anything else is rejected.
    pub fn parse(raw: Option<&str>) -> Result<Self, RepoError> {
        match raw {
            None => Ok(SortOrder::Desc),
            Some("asc") => Ok(SortOrder::Asc),
            Some("desc") => Ok(SortOrder::Desc),
            Some(_) => Err(RepoError::BadInput),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Validated pagination window. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: i64,
    pub page: i64,
}

impl PageQuery {
    pub fn from_raw(limit: Option<&str>, page: Option<&str>) -> Result<Self, RepoError> {
        let query = PageQuery {
            limit: parse_positive(limit, DEFAULT_LIMIT)?,
            page: parse_positive(page, 1)?,
        };
        // A window whose offset does not fit in i64 is as invalid as a
        // negative page number.
        if (query.page - 1).checked_mul(query.limit).is_none() {
            return Err(RepoError::BadInput);
        }
        Ok(query)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        PageQuery { limit: DEFAULT_LIMIT, page: 1 }
    }
}

/// Fully validated articles-list request.
///
/// `sort_by` is a reference into [`ARTICLE_SORT_COLUMNS`], never the client
/// string. Validation order matches the request contract: direction first,
/// then sort column, then pagination. Topic existence is the accessor's job.
#[derive(Debug, Clone)]
pub struct ArticleQuery {
    pub sort_by: &'static str,
    pub order: SortOrder,
    pub topic: Option<String>,
    pub page: PageQuery,
}

impl ArticleQuery {
    pub fn from_raw(
        sort_by: Option<&str>,
        order: Option<&str>,
        topic: Option<&str>,
        limit: Option<&str>,
        page: Option<&str>,
    ) -> Result<Self, RepoError> {
        let order = SortOrder::parse(order)?;
        let sort_by = validate_sort_column(sort_by)?;
        let page = PageQuery::from_raw(limit, page)?;
        Ok(ArticleQuery {
            sort_by,
            order,
            topic: topic.map(str::to_string),
            page,
        })
    }
}

impl Default for ArticleQuery {
    fn default() -> Self {
        ArticleQuery {
            sort_by: DEFAULT_SORT_COLUMN,
            order: SortOrder::Desc,
            topic: None,
            page: PageQuery::default(),
        }
    }
}

fn validate_sort_column(raw: Option<&str>) -> Result<&'static str, RepoError> {
    let requested = raw.unwrap_or(DEFAULT_SORT_COLUMN);
    ARTICLE_SORT_COLUMNS
        .iter()
        .find(|col| **col == requested)
        .copied()
        .ok_or(RepoError::BadInput)
}

fn parse_positive(raw: Option<&str>, default: i64) -> Result<i64, RepoError> {
    match raw {
        None => Ok(default),
        Some(s) => match s.parse::<i64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(RepoError::BadInput),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_created_at_desc_limit_10_page_1() {
        let q = ArticleQuery::from_raw(None, None, None, None, None).unwrap();
        assert_eq!(q.sort_by, "created_at");
        assert_eq!(q.order, SortOrder::Desc);
        assert_eq!(q.page.limit, 10);
        assert_eq!(q.page.page, 1);
        assert_eq!(q.page.offset(), 0);
    }

    #[test]
    fn rejects_unknown_sort_column() {
        let err = ArticleQuery::from_raw(Some("password; DROP TABLE"), None, None, None, None)
            .unwrap_err();
        assert!(matches!(err, RepoError::BadInput));
    }

    #[test]
    fn rejects_bad_order_literal() {
        assert!(matches!(
            SortOrder::parse(Some("sideways")),
            Err(RepoError::BadInput)
        ));
    }

    #[test]
    fn accepts_every_allow_listed_column() {
        for col in ARTICLE_SORT_COLUMNS {
            let q = ArticleQuery::from_raw(Some(col), Some("asc"), None, None, None).unwrap();
            assert_eq!(q.sort_by, *col);
            assert_eq!(q.order, SortOrder::Asc);
        }
    }

    #[test]
    fn pagination_must_be_positive_integers() {
        assert!(PageQuery::from_raw(Some("0"), None).is_err());
        assert!(PageQuery::from_raw(Some("-3"), None).is_err());
        assert!(PageQuery::from_raw(Some("five"), None).is_err());
        assert!(PageQuery::from_raw(None, Some("0")).is_err());

        let p = PageQuery::from_raw(Some("5"), Some("3")).unwrap();
        assert_eq!(p.offset(), 10);
    }

    #[test]
    fn rejects_pagination_window_whose_offset_overflows() {
        let max = i64::MAX.to_string();
        assert!(matches!(
            PageQuery::from_raw(Some(&max), Some("3")),
            Err(RepoError::BadInput)
        ));
        assert!(matches!(
            PageQuery::from_raw(Some("3"), Some(&max)),
            Err(RepoError::BadInput)
        ));

        // page 1 never offsets, so even a huge limit is fine
        let p = PageQuery::from_raw(Some(&max), Some("1")).unwrap();
        assert_eq!(p.offset(), 0);
    }
}
