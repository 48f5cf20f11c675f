use super::handlers::{health, login, otp, student};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Same wiring as the served router; only the document is kept.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Documented portal routes. Anything registered here is both served and
/// listed in `/api-docs/openapi.json`.
pub(crate) fn api_router() -> OpenApiRouter {
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(student::lookup))
        .routes(routes!(student::set_password))
        .routes(routes!(student::register))
        .routes(routes!(otp::send_otp))
        .routes(routes!(otp::verify_otp))
        .routes(routes!(login::login))
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

/// Document skeleton carrying the package metadata from Cargo.toml.
fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(non_empty(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    // Only the first author is advertised.
    info.contact = env!("CARGO_PKG_AUTHORS")
        .split(';')
        .map(parse_author)
        .find(|(name, email)| name.is_some() || email.is_some())
        .map(|(name, email)| {
            let mut contact = Contact::new();
            contact.name = name.map(str::to_string);
            contact.email = email.map(str::to_string);
            contact
        });

    info.license = non_empty(env!("CARGO_PKG_LICENSE")).map(|spdx| {
        let mut license = License::new(spdx);
        license.identifier = Some(spdx.to_string());
        license
    });

    OpenApiBuilder::new()
        .info(info)
        .tags(Some(vec![
            tag("student", "Student lookup, password setup and login"),
            tag("otp", "Email passcode verification"),
            tag("health", "Service and database status"),
        ]))
        .build()
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|trimmed| !trimmed.is_empty())
}

/// Split `Name <email>` into its parts; either may be missing.
fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, rest)) => (non_empty(name), non_empty(rest.trim_end().trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}
