/// Authentication and authorization
///
/// # Modules
///
/// - [`authorization`]: The access policy evaluator (who may do what)
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: Access and refresh tokens
/// - [`middleware`]: Turning a request's bearer token into a principal
///
/// # Example
///
/// ```no_run
/// use memberhub_shared::auth::jwt::{create_token, Claims, TokenType};
/// use memberhub_shared::auth::password::{hash_password, verify_password};
/// use memberhub_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("jardin2024")?;
/// assert!(verify_password("jardin2024", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), Role::Member, TokenType::Access);
/// let token = create_token(&claims, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
