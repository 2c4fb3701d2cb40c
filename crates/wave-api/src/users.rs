use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{error, info, warn};

use wave_db::models::{NewUser, UserChanges, UserRow};
use wave_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest, UserProfile, UserUpdate};
use wave_types::validate::{DEFAULT_TIMEZONE, Validate, parse_birthday, parse_timezone};

use crate::error::ApiError;
use crate::identity::IdentityError;
use crate::state::{AppState, with_db};

/// POST /v1/user/register: creates the identity account first, then the
/// local row keyed by the identity uid.
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let birthday = req.birthday.as_deref().map(parse_birthday).transpose()?;
    let timezone = req
        .timezone
        .clone()
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

    let email = req.email.clone();
    if with_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let account = state
        .identity
        .create_account(&req.email, &req.password, &req.name)
        .await
        .map_err(|e| match e {
            IdentityError::EmailExists => ApiError::Conflict("Email already exists".into()),
            other => ApiError::upstream("Could not create identity account", other),
        })?;

    let new_user = NewUser {
        id: account.uid,
        email: req.email,
        name: req.name,
        birthday,
        occupation: req.occupation,
        timezone,
    };
    let uid = new_user.id.clone();
    let user = match with_db(&state, move |db| db.create_user(&new_user)).await {
        Ok(user) => user,
        Err(e) => {
            // Without a local row the account is unreachable; drop it.
            if let Err(rollback) = state.identity.delete_account(&uid).await {
                error!("Orphaned identity account {}: {}", uid, rollback);
            }
            return Err(match e {
                ApiError::Conflict(_) => ApiError::Conflict("Email already registered".into()),
                other => other,
            });
        }
    };

    info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: profile_in(user, &Utc),
            access_token: account.token,
            token_type: "bearer".into(),
        }),
    ))
}

/// POST /v1/user/login: trades email and password for a fresh token.
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<Json<AuthResponse>, ApiError> {
    req.validate()?;

    let account = state
        .identity
        .sign_in(&req.email, &req.password)
        .await
        .map_err(|e| match e {
            IdentityError::InvalidCredentials => ApiError::Unauthorized,
            other => ApiError::upstream("Could not sign in", other),
        })?;

    let uid = account.uid.clone();
    let user = with_db(&state, move |db| db.get_user_by_id(&uid))
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(AuthResponse {
        user: profile_in(user, &Utc),
        access_token: account.token,
        token_type: "bearer".into(),
    }))
}

/// PATCH /v1/user/{user_id}: applies only the fields present in the body.
/// A blank value means "unset": nullable fields are cleared, `timezone`
/// resets to UTC, and `name` (which cannot be null) is left as is.
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(update), _): WithRejection<Json<UserUpdate>, ApiError>,
) -> Result<Json<UserProfile>, ApiError> {
    update.validate()?;

    let uid = user_id.clone();
    if with_db(&state, move |db| db.get_user_by_id(&uid))
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("User"));
    }

    if user_id != claims.user_id {
        return Err(ApiError::Forbidden(
            "You don't have permission to update this user".into(),
        ));
    }

    let changes = UserChanges {
        name: update.name.flatten(),
        birthday: update
            .birthday
            .map(|b| b.as_deref().map(parse_birthday).transpose())
            .transpose()?,
        occupation: update.occupation,
        timezone: update
            .timezone
            .map(|tz| tz.unwrap_or_else(|| DEFAULT_TIMEZONE.to_string())),
    };
    let new_name = changes.name.clone();

    let uid = user_id.clone();
    let user = with_db(&state, move |db| db.update_user(&uid, &changes))
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    // The local row is committed; a failed sync is reported but not undone.
    if let Some(name) = new_name {
        if let Err(e) = state.identity.update_display_name(&user_id, &name).await {
            error!("User {} updated locally but display name sync failed: {}", user_id, e);
            return Err(ApiError::upstream(
                "Profile updated but display name sync failed",
                e,
            ));
        }
    }

    info!("Updated profile of user {}", user_id);
    Ok(Json(profile_in(user, &Utc)))
}

/// GET /v1/users/{user_id}: any authenticated caller may read a profile.
/// Timestamps are rendered in the user's own timezone.
pub async fn read_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = with_db(&state, move |db| db.get_user_by_id(&user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    let zone = parse_timezone(&user.timezone).unwrap_or_else(|_| {
        warn!("User {} has unknown timezone '{}'", user.id, user.timezone);
        Tz::UTC
    });

    Ok(Json(profile_in(user, &zone)))
}

fn profile_in<Z: TimeZone>(user: UserRow, zone: &Z) -> UserProfile {
    UserProfile {
        birthday: user.birthday.map(|b| b.with_timezone(zone).fixed_offset()),
        sign_up_day: user.sign_up_day.with_timezone(zone).fixed_offset(),
        id: user.id,
        email: user.email,
        name: user.name,
        occupation: user.occupation,
        timezone: user.timezone,
    }
}
