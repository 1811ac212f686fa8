// Type classifier — maps (object type, verb) pairs onto the closed feed taxonomy.
//
// The rule table is plain data evaluated top to bottom; the first matching
// rule decides the category. Several rules overlap (a `Like` on a `Note`
// matches nothing in the Note rules but does match the verb-only Like rule),
// so table order is part of the contract. Anything left unmatched is `Other`.

use serde::{Deserialize, Serialize};

/// The user-facing category of an activity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    CreateWaste,
    CreatePost,
    UpdatePost,
    DeletePost,
    CreateComment,
    UpdateComment,
    LikePost,
    FollowUser,
    UnfollowUser,
    Other,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 10] = [
        Category::CreateWaste,
        Category::CreatePost,
        Category::UpdatePost,
        Category::DeletePost,
        Category::CreateComment,
        Category::UpdateComment,
        Category::LikePost,
        Category::FollowUser,
        Category::UnfollowUser,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::CreateWaste => "CreateWaste",
            Category::CreatePost => "CreatePost",
            Category::UpdatePost => "UpdatePost",
            Category::DeletePost => "DeletePost",
            Category::CreateComment => "CreateComment",
            Category::UpdateComment => "UpdateComment",
            Category::LikePost => "LikePost",
            Category::FollowUser => "FollowUser",
            Category::UnfollowUser => "UnfollowUser",
            Category::Other => "Other",
        }
    }

    /// Parse a category name, case-insensitively. Returns `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// True for categories that describe a post and may carry reaction counters.
    pub fn is_post(&self) -> bool {
        matches!(
            self,
            Category::CreatePost | Category::UpdatePost | Category::DeletePost
        )
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One side of a rule: either a specific value or a wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    Any,
    Exact(&'static str),
}

impl Match {
    fn accepts(&self, value: Option<&str>) -> bool {
        match self {
            Match::Any => true,
            Match::Exact(expected) => value == Some(*expected),
        }
    }
}

/// A single classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub object_type: Match,
    pub verb: Match,
    pub category: Category,
}

const fn rule(object_type: Match, verb: Match, category: Category) -> Rule {
    Rule {
        object_type,
        verb,
        category,
    }
}

/// The ordered rule table. First match wins.
pub const RULES: &[Rule] = &[
    rule(Match::Exact("UserWaste"), Match::Exact("Create"), Category::CreateWaste),
    rule(Match::Exact("Note"), Match::Exact("Create"), Category::CreatePost),
    rule(Match::Exact("Note"), Match::Exact("Update"), Category::UpdatePost),
    rule(Match::Exact("Note"), Match::Exact("Delete"), Category::DeletePost),
    rule(Match::Exact("Comment"), Match::Exact("Create"), Category::CreateComment),
    rule(Match::Exact("Comment"), Match::Exact("Update"), Category::UpdateComment),
    rule(Match::Any, Match::Exact("Like"), Category::LikePost),
    rule(Match::Exact("Follow"), Match::Exact("Follow"), Category::FollowUser),
    rule(Match::Exact("Follow"), Match::Exact("Undo"), Category::UnfollowUser),
    // Provisional: some API builds emit a bare `Unfollow` verb instead of Undo.
    rule(Match::Exact("Follow"), Match::Exact("Unfollow"), Category::UnfollowUser),
];

/// Classify against the default rule table.
pub fn classify(object_type: Option<&str>, verb: Option<&str>) -> Category {
    classify_with(RULES, object_type, verb)
}

/// Classify against an arbitrary rule table. Unmatched input maps to `Other`.
pub fn classify_with(rules: &[Rule], object_type: Option<&str>, verb: Option<&str>) -> Category {
    rules
        .iter()
        .find(|r| r.object_type.accepts(object_type) && r.verb.accepts(verb))
        .map(|r| r.category)
        .unwrap_or(Category::Other)
}
