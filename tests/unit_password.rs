use schoolyard::utils::password::{hash_password, verify_password};

#[test]
fn hash_and_verify_roundtrip() {
    let hashed = hash_password("correct horse battery staple").unwrap();
    assert_ne!(hashed, "correct horse battery staple");
    assert!(verify_password("correct horse battery staple", &hashed).unwrap());
}

#[test]
fn wrong_password_fails_verification() {
    let hashed = hash_password("s3cret-password").unwrap();
    assert!(!verify_password("not-the-password", &hashed).unwrap());
}

#[test]
fn malformed_hash_is_an_error() {
    assert!(verify_password("anything", "not-a-bcrypt-hash").is_err());
}
