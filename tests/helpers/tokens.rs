use vss_graphql::authz::{JwtAlgorithm, TokenClaims, TokenIssuer};

pub const SECRET: &str = "integration-test-secret-0123456789abcdef0123456789abcdef";

/// HS256 token for `uid` carrying `permissions`
pub fn token_for(uid: i64, permissions: &[&str]) -> String {
    TokenIssuer::new(JwtAlgorithm::Hs256, SECRET.as_bytes())
        .expect("Failed to build issuer")
        .issue(&TokenClaims::new(uid, permissions.iter().copied()), None)
        .expect("Failed to issue token")
}
