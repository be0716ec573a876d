use serde::Serialize;

use crate::value::FrontValue;

/// One entry of the blog index.
///
/// Every field is always serialized; absent values become `null` so that
/// consumers see the same eight keys on every record.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ArticleRecord {
    pub title: String,
    pub date: Option<String>,
    pub category: Option<FrontValue>,
    pub tag: Option<FrontValue>,
    pub series: Option<Series>,
    pub order: Option<FrontValue>,
    pub summary: Option<FrontValue>,
    pub path: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Series {
    pub name: Option<FrontValue>,
    pub episode: Option<FrontValue>,
}

/// Records in enumeration order.
pub type Index = Vec<ArticleRecord>;
