use crate::{
    config::AppConfig,
    database::{MongoDB, USERS},
    models::{CurrentUser, User},
    services::auth_service::{self, Claims},
    utils::AppError,
};
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;
use mongodb::bson::doc;
use std::future::{ready, Ready};
use std::rc::Rc;

/// JWT authentication for a scope.
///
/// Tokens are verified and the account is loaded on every request, so bans,
/// deletions and role changes take effect immediately. An invalid token is
/// rejected even on optional scopes; a missing one only on required scopes.
pub struct AuthMiddleware {
    required: bool,
}

impl AuthMiddleware {
    pub fn required() -> Self {
        AuthMiddleware { required: true }
    }

    pub fn optional() -> Self {
        AuthMiddleware { required: false }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            required: self.required,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    required: bool,
}

/// Token from an `Authorization` header value; `Ok(None)` when absent
pub fn bearer_token(header: Option<&str>) -> Result<Option<&str>, AppError> {
    match header {
        None => Ok(None),
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
            _ => Err(AppError::Unauthorized("Invalid token format".to_string())),
        },
    }
}

async fn authenticate(req: &ServiceRequest) -> Result<Option<(CurrentUser, Claims)>, AppError> {
    let header = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .map(|v| v.to_str().map_err(|_| AppError::Unauthorized("Invalid token format".to_string())))
        .transpose()?;

    let token = match bearer_token(header)? {
        Some(token) => token,
        None => return Ok(None),
    };

    let config = req
        .app_data::<web::Data<AppConfig>>()
        .ok_or_else(|| AppError::Internal("AppConfig not registered".to_string()))?;
    let claims = auth_service::verify_token(&config.jwt, token)?;

    let db = req
        .app_data::<web::Data<MongoDB>>()
        .ok_or_else(|| AppError::Internal("MongoDB not registered".to_string()))?;
    let user = db
        .collection::<User>(USERS)
        .find_one(doc! { "user_id": &claims.sub })
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    if user.is_banned {
        return Err(AppError::Forbidden(match &user.ban_reason {
            Some(reason) => format!("Account is banned: {}", reason),
            None => "Account is banned".to_string(),
        }));
    }

    Ok(Some((CurrentUser::from(&user), claims)))
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required = self.required;

        Box::pin(async move {
            match authenticate(&req).await {
                Ok(Some((user, claims))) => {
                    req.extensions_mut().insert(user);
                    req.extensions_mut().insert(claims);
                }
                Ok(None) if required => {
                    return Err(AppError::Unauthorized("Missing authorization token".to_string()).into());
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("🔒 {} {} rejected: {}", req.method(), req.path(), e);
                    return Err(e.into());
                }
            }

            service.call(req).await
        })
    }
}

/// Authenticated caller; 401 when the request carries no valid token
#[derive(Debug, Clone)]
pub struct AuthUser(pub CurrentUser);

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<CurrentUser>().cloned();
        ready(
            user.map(AuthUser)
                .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()).into()),
        )
    }
}

/// Authenticated admin; 401 without a token, 403 for other roles
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

impl FromRequest for AdminUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = match req.extensions().get::<CurrentUser>() {
            Some(user) if user.is_admin() => Ok(AdminUser(user.clone())),
            Some(_) => Err(AppError::Forbidden("Admin access required".to_string()).into()),
            None => Err(AppError::Unauthorized("Authentication required".to_string()).into()),
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use actix_web::{http::StatusCode, test, App, HttpResponse};

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.0.user_id)
    }

    async fn admin_only(_admin: AdminUser) -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(None).unwrap(), None);
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), Some("abc.def"));
        assert!(bearer_token(Some("Basic dXNlcjpwYXNz")).is_err());
        assert!(bearer_token(Some("Bearer ")).is_err());
    }

    #[actix_web::test]
    async fn test_required_scope_rejects_missing_token() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppConfig::for_tests()))
                .service(web::scope("/private").wrap(AuthMiddleware::required()).route("", web::get().to(ok))),
        )
        .await;

        let req = test::TestRequest::get().uri("/private").to_request();
        let err = test::try_call_service(&app, req).await.err().expect("missing token must be rejected");
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_optional_scope() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppConfig::for_tests()))
                .service(web::scope("/public").wrap(AuthMiddleware::optional()).route("", web::get().to(ok))),
        )
        .await;

        // Anonymous requests pass through
        let req = test::TestRequest::get().uri("/public").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // A bad token is still an error
        let req = test::TestRequest::get()
            .uri("/public")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request();
        let err = test::try_call_service(&app, req).await.err().expect("invalid token must be rejected");
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_extractors_without_middleware() {
        let app = test::init_service(
            App::new()
                .route("/me", web::get().to(whoami))
                .route("/admin", web::get().to(admin_only)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = test::call_service(&app, test::TestRequest::get().uri("/admin").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_admin_extractor_checks_role() {
        let member = CurrentUser {
            user_id: "u1".to_string(),
            name: "Juan".to_string(),
            email: "juan@example.com".to_string(),
            role: Role::User,
        };
        let req = test::TestRequest::default().to_http_request();
        req.extensions_mut().insert(member.clone());
        let err = AdminUser::extract(&req).await.err().expect("members are not admins");
        assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::default().to_http_request();
        req.extensions_mut().insert(CurrentUser { role: Role::Admin, ..member });
        assert!(AdminUser::extract(&req).await.is_ok());
        assert_eq!(AuthUser::extract(&req).await.unwrap().0.user_id, "u1");
    }

    #[actix_web::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_banned_and_deleted_accounts_are_rejected() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017/kusinai_test".to_string());
        let db = MongoDB::new(&uri).await.expect("MongoDB must be running");
        let config = AppConfig::for_tests();

        let now = chrono::Utc::now().timestamp();
        let user_id = format!("auth-{}", uuid::Uuid::new_v4());
        let user = User {
            id: None,
            user_id: user_id.clone(),
            name: "Test Cook".to_string(),
            email: format!("{}@example.com", user_id),
            password: "not-a-real-hash".to_string(),
            role: Role::User,
            avatar_url: None,
            is_banned: false,
            ban_reason: None,
            banned_at: None,
            is_verified: true,
            verification_token: None,
            verification_expires_at: None,
            notes: vec![],
            favorites: vec![],
            created_at: now,
            updated_at: now,
            last_login: None,
        };
        let users = db.collection::<User>(USERS);
        users.insert_one(&user).await.unwrap();
        let (token, _) = auth_service::generate_jwt(&config.jwt, &user).unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(db))
                .service(web::scope("/private").wrap(AuthMiddleware::required()).route("", web::get().to(whoami))),
        )
        .await;
        let request = || {
            test::TestRequest::get()
                .uri("/private")
                .insert_header(("Authorization", format!("Bearer {}", token)))
                .to_request()
        };

        let resp = test::call_service(&app, request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        users
            .update_one(doc! { "user_id": &user_id }, doc! { "$set": { "is_banned": true } })
            .await
            .unwrap();
        let err = test::try_call_service(&app, request()).await.err().expect("banned user must be rejected");
        assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);

        users.delete_one(doc! { "user_id": &user_id }).await.unwrap();
        let err = test::try_call_service(&app, request()).await.err().expect("deleted user must be rejected");
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }
}
