//! Permission name constants and the seeded catalog.
//!
//! Permission names are the atomic capabilities checked by the
//! authorization guard. Using these constants instead of string literals
//! keeps route declarations and the seeded catalog in sync.

// Schools
pub const SCHOOLS_CREATE: &str = "schools:create";
pub const SCHOOLS_READ: &str = "schools:read";
pub const SCHOOLS_UPDATE: &str = "schools:update";
pub const SCHOOLS_DELETE: &str = "schools:delete";

// Users
pub const USERS_CREATE: &str = "users:create";
pub const USERS_READ: &str = "users:read";
pub const USERS_UPDATE: &str = "users:update";
pub const USERS_DELETE: &str = "users:delete";

// Roles and memberships
pub const ROLES_CREATE: &str = "roles:create";
pub const ROLES_READ: &str = "roles:read";
pub const ROLES_UPDATE: &str = "roles:update";
pub const ROLES_DELETE: &str = "roles:delete";
pub const ROLES_ASSIGN: &str = "roles:assign";

// Students
pub const STUDENTS_CREATE: &str = "students:create";
pub const STUDENTS_READ: &str = "students:read";
pub const STUDENTS_UPDATE: &str = "students:update";
pub const STUDENTS_DELETE: &str = "students:delete";

// Parents
pub const PARENTS_CREATE: &str = "parents:create";
pub const PARENTS_READ: &str = "parents:read";
pub const PARENTS_UPDATE: &str = "parents:update";
pub const PARENTS_DELETE: &str = "parents:delete";
pub const PARENTS_LINK: &str = "parents:link";

// Reports
pub const REPORTS_VIEW: &str = "reports:view";
pub const REPORTS_EXPORT: &str = "reports:export";

/// The full permission catalog as (name, description, category) rows,
/// seeded at system setup by the migration and re-asserted by the CLI
/// `seed` command.
pub const CATALOG: &[(&str, &str, &str)] = &[
    (SCHOOLS_CREATE, "Create schools", "schools"),
    (SCHOOLS_READ, "View schools", "schools"),
    (SCHOOLS_UPDATE, "Update schools", "schools"),
    (SCHOOLS_DELETE, "Deactivate schools", "schools"),
    (USERS_CREATE, "Create users", "users"),
    (USERS_READ, "View users", "users"),
    (USERS_UPDATE, "Update users", "users"),
    (USERS_DELETE, "Delete users", "users"),
    (ROLES_CREATE, "Create roles", "roles"),
    (ROLES_READ, "View roles and permissions", "roles"),
    (ROLES_UPDATE, "Update roles and their permissions", "roles"),
    (ROLES_DELETE, "Delete roles", "roles"),
    (ROLES_ASSIGN, "Manage school memberships", "roles"),
    (STUDENTS_CREATE, "Create students", "students"),
    (STUDENTS_READ, "View students", "students"),
    (STUDENTS_UPDATE, "Update students", "students"),
    (STUDENTS_DELETE, "Delete students", "students"),
    (PARENTS_CREATE, "Create parents", "parents"),
    (PARENTS_READ, "View parents", "parents"),
    (PARENTS_UPDATE, "Update parents", "parents"),
    (PARENTS_DELETE, "Delete parents", "parents"),
    (PARENTS_LINK, "Link parents to students", "parents"),
    (REPORTS_VIEW, "View reports", "reports"),
    (REPORTS_EXPORT, "Export reports", "reports"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_names_are_unique() {
        let names: HashSet<&str> = CATALOG.iter().map(|(name, _, _)| *name).collect();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn catalog_names_match_their_category() {
        for (name, _, category) in CATALOG {
            assert!(
                name.starts_with(&format!("{}:", category)),
                "{} not under category {}",
                name,
                category
            );
        }
    }
}
