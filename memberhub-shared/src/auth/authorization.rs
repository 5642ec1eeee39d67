/// Access policy evaluator
///
/// Every read and write decision in MemberHub goes through this module. The
/// functions here are pure: they take the requester and the policy-relevant
/// attributes of a resource and return a decision, never touching the
/// database and never failing.
///
/// # Permission Model
///
/// | Requester | Articles (published)                          | Events (published)  | Writes                          |
/// |-----------|-----------------------------------------------|---------------------|---------------------------------|
/// | anonymous | `public`                                      | not member-only     | none                            |
/// | member    | `public`, `adherent`, `adherent_retraite`     | all                 | create articles, edit own, register |
/// | retraite  | `public`, `retraite`, `adherent_retraite`     | all                 | create articles, edit own, register |
/// | admin     | everything, any status                        | everything          | everything                      |
///
/// Authors always see their own articles whatever their status or visibility.
/// Non-published content is otherwise hidden from everyone but admins.
///
/// # Example
///
/// ```
/// use memberhub_shared::auth::authorization::{authorize, Action, ArticleAccess, Principal, Resource};
/// use memberhub_shared::models::article::{ArticleStatus, Visibility};
/// use memberhub_shared::models::user::Role;
/// use uuid::Uuid;
///
/// let member = Principal::user(Uuid::new_v4(), Role::Member);
/// let article = ArticleAccess {
///     author_id: None,
///     visibility: Visibility::AdherentRetraite,
///     status: ArticleStatus::Published,
/// };
///
/// assert!(authorize(&member, Action::View, Resource::Article(&article)).is_ok());
/// assert!(authorize(&Principal::Anonymous, Action::View, Resource::Article(&article)).is_err());
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::article::{ArticleStatus, Visibility};
use crate::models::event::EventStatus;
use crate::models::user::Role;

/// Error type for authorization checks
///
/// The two variants keep "who are you?" apart from "you may not": the HTTP
/// layer maps them to 401 and 403 respectively.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No valid credential was presented
    #[error("Authentication required")]
    Unauthenticated,

    /// Authenticated, but role or ownership is insufficient
    #[error("Not allowed to {action} this {resource}")]
    Forbidden {
        action: &'static str,
        resource: &'static str,
    },
}

/// The requester of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Principal {
    /// No credential presented
    Anonymous,

    /// Approved user (pending and rejected accounts never become principals)
    User { id: Uuid, role: Role },
}

impl Principal {
    pub fn user(id: Uuid, role: Role) -> Self {
        Principal::User { id, role }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Principal::Anonymous => None,
            Principal::User { id, .. } => Some(*id),
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Principal::Anonymous => None,
            Principal::User { role, .. } => Some(*role),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Principal::User { .. })
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// Whether this principal is the given author
    fn is_author_of(&self, author_id: Option<Uuid>) -> bool {
        matches!((self.user_id(), author_id), (Some(me), Some(author)) if me == author)
    }
}

/// Operation being attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
    /// Register for an event
    Register,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Register => "register for",
        }
    }
}

/// Policy-relevant attributes of an article
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleAccess {
    pub author_id: Option<Uuid>,
    pub visibility: Visibility,
    pub status: ArticleStatus,
}

/// Policy-relevant attributes of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventAccess {
    pub is_member_only: bool,
    pub status: EventStatus,
}

/// Target of an operation
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// An existing article
    Article(&'a ArticleAccess),

    /// The article collection (creation)
    Articles,

    /// An existing event
    Event(&'a EventAccess),

    /// The event collection (creation)
    Events,

    /// Admin panel: users, contact inbox, activity log, statistics
    AdminPanel,
}

impl Resource<'_> {
    fn as_str(&self) -> &'static str {
        match self {
            Resource::Article(_) | Resource::Articles => "article",
            Resource::Event(_) | Resource::Events => "event",
            Resource::AdminPanel => "admin resource",
        }
    }
}

/// Visibilities a role may read on published articles
///
/// Anonymous requesters are represented by `None`.
pub fn readable_visibilities(role: Option<Role>) -> &'static [Visibility] {
    match role {
        None => &[Visibility::Public],
        Some(Role::Member) => &[
            Visibility::Public,
            Visibility::Adherent,
            Visibility::AdherentRetraite,
        ],
        Some(Role::Retraite) => &[
            Visibility::Public,
            Visibility::Retraite,
            Visibility::AdherentRetraite,
        ],
        Some(Role::Admin) => &Visibility::ALL,
    }
}

/// Whether `principal` may read `article`
pub fn can_view_article(principal: &Principal, article: &ArticleAccess) -> bool {
    if principal.is_admin() || principal.is_author_of(article.author_id) {
        return true;
    }

    article.status == ArticleStatus::Published
        && readable_visibilities(principal.role()).contains(&article.visibility)
}

/// Whether `principal` may read `event`
pub fn can_view_event(principal: &Principal, event: &EventAccess) -> bool {
    if principal.is_admin() {
        return true;
    }

    event.status == EventStatus::Published && (principal.is_authenticated() || !event.is_member_only)
}

/// The single decision point for every action on every resource
///
/// # Rules
///
/// - Admins may do anything.
/// - `View` follows [`can_view_article`] / [`can_view_event`]; the admin panel
///   is admin-only.
/// - `Create` on articles requires an authenticated principal; on events, admin.
/// - `Update` / `Delete` on an article require authorship; on an event, admin.
/// - `Register` requires an authenticated principal and a published event the
///   principal can view. Capacity and duplicates are checked at write time.
pub fn evaluate(principal: &Principal, action: Action, resource: Resource<'_>) -> bool {
    if principal.is_admin() {
        return true;
    }

    match (action, resource) {
        (Action::View, Resource::Article(article)) => can_view_article(principal, article),
        (Action::View, Resource::Event(event)) => can_view_event(principal, event),
        (Action::View, Resource::Articles | Resource::Events) => true,

        (Action::Create, Resource::Articles) => principal.is_authenticated(),

        (Action::Update | Action::Delete, Resource::Article(article)) => {
            principal.is_author_of(article.author_id)
        }

        (Action::Register, Resource::Event(event)) => {
            principal.is_authenticated()
                && event.status == EventStatus::Published
                && can_view_event(principal, event)
        }

        // Event management, the admin panel, and nonsensical pairs
        _ => false,
    }
}

/// Evaluates the policy and turns a denial into an [`AuthzError`]
///
/// Denials for anonymous principals become `Unauthenticated` so the client is
/// told to log in; denials for authenticated ones become `Forbidden`.
pub fn authorize(principal: &Principal, action: Action, resource: Resource<'_>) -> Result<(), AuthzError> {
    if evaluate(principal, action, resource) {
        return Ok(());
    }

    tracing::debug!(
        ?principal,
        action = action.as_str(),
        resource = resource.as_str(),
        "Access denied by policy"
    );

    match principal {
        Principal::Anonymous => Err(AuthzError::Unauthenticated),
        Principal::User { .. } => Err(AuthzError::Forbidden {
            action: action.as_str(),
            resource: resource.as_str(),
        }),
    }
}

/// Requires an authenticated principal, returning its user id and role
pub fn require_user(principal: &Principal) -> Result<(Uuid, Role), AuthzError> {
    match principal {
        Principal::Anonymous => Err(AuthzError::Unauthenticated),
        Principal::User { id, role } => Ok((*id, *role)),
    }
}

/// Row filter for article listings
///
/// `matches` agrees with [`can_view_article`] for every input; the model layer
/// translates the same filter to SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleFilter {
    /// Every row, any status
    Unrestricted,

    /// Published rows with one of `visibilities`, plus any row by `author_id`
    Restricted {
        visibilities: Vec<Visibility>,
        author_id: Option<Uuid>,
    },
}

impl ArticleFilter {
    pub fn matches(&self, article: &ArticleAccess) -> bool {
        match self {
            ArticleFilter::Unrestricted => true,
            ArticleFilter::Restricted {
                visibilities,
                author_id,
            } => {
                (article.status == ArticleStatus::Published && visibilities.contains(&article.visibility))
                    || (author_id.is_some() && *author_id == article.author_id)
            }
        }
    }
}

/// Article listing filter for `principal`
pub fn article_list_filter(principal: &Principal) -> ArticleFilter {
    if principal.is_admin() {
        return ArticleFilter::Unrestricted;
    }

    ArticleFilter::Restricted {
        visibilities: readable_visibilities(principal.role()).to_vec(),
        author_id: principal.user_id(),
    }
}

/// Row filter for event listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    /// Every row, any status
    Unrestricted,

    /// Published rows; member-only ones only if `include_member_only`
    Published { include_member_only: bool },
}

impl EventFilter {
    pub fn matches(&self, event: &EventAccess) -> bool {
        match self {
            EventFilter::Unrestricted => true,
            EventFilter::Published { include_member_only } => {
                event.status == EventStatus::Published && (*include_member_only || !event.is_member_only)
            }
        }
    }
}

/// Event listing filter for `principal`
pub fn event_list_filter(principal: &Principal) -> EventFilter {
    if principal.is_admin() {
        return EventFilter::Unrestricted;
    }

    EventFilter::Published {
        include_member_only: principal.is_authenticated(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(visibility: Visibility, status: ArticleStatus) -> ArticleAccess {
        ArticleAccess {
            author_id: None,
            visibility,
            status,
        }
    }

    fn event(is_member_only: bool, status: EventStatus) -> EventAccess {
        EventAccess { is_member_only, status }
    }

    fn member() -> Principal {
        Principal::user(Uuid::new_v4(), Role::Member)
    }

    fn retraite() -> Principal {
        Principal::user(Uuid::new_v4(), Role::Retraite)
    }

    fn admin() -> Principal {
        Principal::user(Uuid::new_v4(), Role::Admin)
    }

    #[test]
    fn test_adherent_retraite_article_scenario() {
        let a = article(Visibility::AdherentRetraite, ArticleStatus::Published);

        assert!(can_view_article(&member(), &a));
        assert!(can_view_article(&retraite(), &a));
        assert!(can_view_article(&admin(), &a));
        assert!(!can_view_article(&Principal::Anonymous, &a));
    }

    #[test]
    fn test_member_never_sees_retraite_only() {
        let a = article(Visibility::Retraite, ArticleStatus::Published);
        assert!(!can_view_article(&member(), &a));
        assert!(can_view_article(&retraite(), &a));
    }

    #[test]
    fn test_retraite_never_sees_adherent_only() {
        let a = article(Visibility::Adherent, ArticleStatus::Published);
        assert!(!can_view_article(&retraite(), &a));
        assert!(can_view_article(&member(), &a));
    }

    #[test]
    fn test_anonymous_sees_only_public_published() {
        let anon = Principal::Anonymous;
        assert!(can_view_article(&anon, &article(Visibility::Public, ArticleStatus::Published)));
        assert!(!can_view_article(&anon, &article(Visibility::Public, ArticleStatus::Draft)));
        assert!(!can_view_article(&anon, &article(Visibility::Public, ArticleStatus::Archived)));
        assert!(!can_view_article(&anon, &article(Visibility::Adherent, ArticleStatus::Published)));
    }

    #[test]
    fn test_drafts_hidden_from_non_authors() {
        let draft = article(Visibility::Public, ArticleStatus::Draft);
        assert!(!can_view_article(&member(), &draft));
        assert!(!can_view_article(&retraite(), &draft));
        assert!(can_view_article(&admin(), &draft));
    }

    #[test]
    fn test_author_sees_own_draft_with_any_visibility() {
        let author_id = Uuid::new_v4();
        let author = Principal::user(author_id, Role::Member);
        let own = ArticleAccess {
            author_id: Some(author_id),
            visibility: Visibility::Retraite,
            status: ArticleStatus::Draft,
        };

        assert!(can_view_article(&author, &own));
        assert!(!can_view_article(&member(), &own));
    }

    #[test]
    fn test_orphaned_article_has_no_author() {
        // author_id NULL must not match an anonymous principal
        let orphan = article(Visibility::Adherent, ArticleStatus::Draft);
        assert!(!can_view_article(&Principal::Anonymous, &orphan));
        assert!(!evaluate(&Principal::Anonymous, Action::Update, Resource::Article(&orphan)));
    }

    #[test]
    fn test_article_create_requires_authentication() {
        assert!(evaluate(&member(), Action::Create, Resource::Articles));
        assert!(evaluate(&retraite(), Action::Create, Resource::Articles));
        assert!(evaluate(&admin(), Action::Create, Resource::Articles));
        assert_eq!(
            authorize(&Principal::Anonymous, Action::Create, Resource::Articles),
            Err(AuthzError::Unauthenticated)
        );
    }

    #[test]
    fn test_article_update_delete_author_or_admin() {
        let author_id = Uuid::new_v4();
        let author = Principal::user(author_id, Role::Retraite);
        let a = ArticleAccess {
            author_id: Some(author_id),
            visibility: Visibility::Public,
            status: ArticleStatus::Published,
        };

        for action in [Action::Update, Action::Delete] {
            assert!(evaluate(&author, action, Resource::Article(&a)));
            assert!(evaluate(&admin(), action, Resource::Article(&a)));
            assert!(!evaluate(&member(), action, Resource::Article(&a)));
        }

        assert!(matches!(
            authorize(&member(), Action::Delete, Resource::Article(&a)),
            Err(AuthzError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_event_visibility() {
        let public = event(false, EventStatus::Published);
        let members_only = event(true, EventStatus::Published);

        assert!(can_view_event(&Principal::Anonymous, &public));
        assert!(!can_view_event(&Principal::Anonymous, &members_only));
        assert!(can_view_event(&member(), &members_only));
        assert!(can_view_event(&retraite(), &members_only));
    }

    #[test]
    fn test_unpublished_events_admin_only() {
        for status in [EventStatus::Draft, EventStatus::Cancelled] {
            let e = event(false, status);
            assert!(!can_view_event(&Principal::Anonymous, &e));
            assert!(!can_view_event(&member(), &e));
            assert!(can_view_event(&admin(), &e));
        }
    }

    #[test]
    fn test_event_management_admin_only() {
        let e = event(false, EventStatus::Published);

        assert!(evaluate(&admin(), Action::Create, Resource::Events));
        assert!(!evaluate(&member(), Action::Create, Resource::Events));
        assert!(!evaluate(&retraite(), Action::Update, Resource::Event(&e)));
        assert!(!evaluate(&member(), Action::Delete, Resource::Event(&e)));
        assert_eq!(
            authorize(&Principal::Anonymous, Action::Create, Resource::Events),
            Err(AuthzError::Unauthenticated)
        );
    }

    #[test]
    fn test_event_registration() {
        let members_only = event(true, EventStatus::Published);
        let draft = event(false, EventStatus::Draft);

        assert!(evaluate(&member(), Action::Register, Resource::Event(&members_only)));
        assert!(evaluate(&retraite(), Action::Register, Resource::Event(&members_only)));
        assert!(!evaluate(&member(), Action::Register, Resource::Event(&draft)));
        assert_eq!(
            authorize(&Principal::Anonymous, Action::Register, Resource::Event(&members_only)),
            Err(AuthzError::Unauthenticated)
        );
    }

    #[test]
    fn test_admin_panel() {
        assert!(evaluate(&admin(), Action::View, Resource::AdminPanel));
        assert!(!evaluate(&member(), Action::View, Resource::AdminPanel));
        assert!(!evaluate(&retraite(), Action::Update, Resource::AdminPanel));
        assert_eq!(
            authorize(&Principal::Anonymous, Action::View, Resource::AdminPanel),
            Err(AuthzError::Unauthenticated)
        );
    }

    #[test]
    fn test_list_filters() {
        assert_eq!(article_list_filter(&admin()), ArticleFilter::Unrestricted);
        assert_eq!(
            article_list_filter(&Principal::Anonymous),
            ArticleFilter::Restricted {
                visibilities: vec![Visibility::Public],
                author_id: None,
            }
        );

        assert_eq!(event_list_filter(&admin()), EventFilter::Unrestricted);
        assert_eq!(
            event_list_filter(&member()),
            EventFilter::Published { include_member_only: true }
        );
        assert_eq!(
            event_list_filter(&Principal::Anonymous),
            EventFilter::Published { include_member_only: false }
        );
    }

    #[test]
    fn test_require_user() {
        let id = Uuid::new_v4();
        assert_eq!(
            require_user(&Principal::user(id, Role::Retraite)),
            Ok((id, Role::Retraite))
        );
        assert_eq!(require_user(&Principal::Anonymous), Err(AuthzError::Unauthenticated));
    }

    #[test]
    fn test_authz_error_display() {
        let err = AuthzError::Forbidden {
            action: "delete",
            resource: "article",
        };
        assert_eq!(err.to_string(), "Not allowed to delete this article");
        assert_eq!(AuthzError::Unauthenticated.to_string(), "Authentication required");
    }
}
