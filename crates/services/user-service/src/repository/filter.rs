//! Composable query predicates for the users table.

use sea_orm::sea_query::SimpleExpr;
use sea_orm::{ColumnTrait, Condition};

use super::entities::user::Column;

/// A single named predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserPredicate {
    /// Exact id match
    IdEq(i64),
    /// Id is one of the given values
    IdIn(Vec<i64>),
    /// Username contains the given substring
    UsernameContains(String),
}

impl UserPredicate {
    fn into_expr(self) -> SimpleExpr {
        match self {
            UserPredicate::IdEq(id) => Column::Id.eq(id),
            UserPredicate::IdIn(ids) => Column::Id.is_in(ids),
            UserPredicate::UsernameContains(needle) => Column::Username.contains(needle),
        }
    }
}

/// Set of predicates combined with logical AND. An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    predicates: Vec<UserPredicate>,
}

impl UserFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: UserPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn id(self, id: i64) -> Self {
        self.with(UserPredicate::IdEq(id))
    }

    pub fn id_in(self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.with(UserPredicate::IdIn(ids.into_iter().collect()))
    }

    /// Add a substring filter on username when `needle` is present and non-empty.
    pub fn username_contains(self, needle: Option<&str>) -> Self {
        match needle {
            Some(needle) if !needle.is_empty() => self.with(UserPredicate::UsernameContains(needle.to_string())),
            _ => self,
        }
    }

    pub fn predicates(&self) -> &[UserPredicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn into_condition(self) -> Condition {
        self.predicates
            .into_iter()
            .fold(Condition::all(), |cond, p| cond.add(p.into_expr()))
    }
}
