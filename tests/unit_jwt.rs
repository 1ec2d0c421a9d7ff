use uuid::Uuid;

use schoolyard::config::jwt::JwtConfig;
use schoolyard::utils::jwt::{
    create_access_token, create_refresh_token, verify_refresh_token, verify_token,
};

fn test_config() -> JwtConfig {
    JwtConfig {
        secret: "unit-test-secret".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 604800,
    }
}

#[test]
fn access_token_roundtrip_preserves_claims() {
    let config = test_config();
    let user_id = Uuid::new_v4();
    let school_id = Uuid::new_v4();

    let token =
        create_access_token(user_id, "teacher@example.com", Some(school_id), &config).unwrap();
    let claims = verify_token(&token, &config).unwrap();

    assert_eq!(claims.sub, user_id.to_string());
    assert_eq!(claims.email, "teacher@example.com");
    assert_eq!(claims.school_id, Some(school_id));
}

#[test]
fn global_session_has_no_school_claim() {
    let config = test_config();
    let token = create_access_token(Uuid::new_v4(), "ops@example.com", None, &config).unwrap();
    let claims = verify_token(&token, &config).unwrap();
    assert_eq!(claims.school_id, None);
}

#[test]
fn token_rejected_with_wrong_secret() {
    let config = test_config();
    let token = create_access_token(Uuid::new_v4(), "a@example.com", None, &config).unwrap();

    let other = JwtConfig {
        secret: "different-secret".to_string(),
        ..test_config()
    };
    assert!(verify_token(&token, &other).is_err());
}

#[test]
fn expired_token_rejected() {
    let config = JwtConfig {
        access_token_expiry: -3600,
        ..test_config()
    };
    let token = create_access_token(Uuid::new_v4(), "a@example.com", None, &config).unwrap();
    assert!(verify_token(&token, &test_config()).is_err());
}

#[test]
fn refresh_token_roundtrip() {
    let config = test_config();
    let user_id = Uuid::new_v4();
    let school_id = Uuid::new_v4();

    let token = create_refresh_token(user_id, Some(school_id), &config).unwrap();
    let claims = verify_refresh_token(&token, &config).unwrap();

    assert_eq!(claims.sub, user_id.to_string());
    assert_eq!(claims.school_id, Some(school_id));
}

#[test]
fn token_kinds_share_secret_and_shape() {
    // The two token kinds share the signing secret and overlapping claims;
    // expiry is what separates their lifetimes.
    let config = test_config();
    let token = create_access_token(Uuid::new_v4(), "a@example.com", None, &config).unwrap();
    assert!(verify_refresh_token(&token, &config).is_ok());
}
