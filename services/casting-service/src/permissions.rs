pub const POST_ACTOR: &str = "post:actor";
pub const PATCH_ACTOR: &str = "patch:actor";
pub const DELETE_ACTOR: &str = "delete:actor";

pub const POST_MOVIE: &str = "post:movie";
pub const PATCH_MOVIE: &str = "patch:movie";
pub const DELETE_MOVIE: &str = "delete:movie";

/// Every permission a route can require; handy for provisioning a full-access role.
pub const ALL_PERMISSIONS: &[&str] = &[
    POST_ACTOR,
    PATCH_ACTOR,
    DELETE_ACTOR,
    POST_MOVIE,
    PATCH_MOVIE,
    DELETE_MOVIE,
];
