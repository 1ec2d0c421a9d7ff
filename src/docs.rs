use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::auth::model::{
    LoginRequest, LoginResponse, MembershipInfo, MessageResponse, ProfileResponse, RefreshRequest,
};
use crate::modules::parents::model::{
    CreateParentDto, LinkStudentDto, PaginatedParentsResponse, Parent, ParentWithStudents,
    UpdateParentDto,
};
use crate::modules::roles::model::{
    AcceptInvitationDto, AssignPermissionsDto, CreateRoleDto, InviteUserDto,
    PaginatedPermissionsResponse, PaginatedRolesResponse, Permission, Role, RoleWithPermissions,
    SchoolMembership, UpdateRoleDto,
};
use crate::modules::schools::model::{
    CreateSchoolDto, PaginatedSchoolsResponse, School, UpdateSchoolDto,
};
use crate::modules::students::model::{
    CreateStudentDto, PaginatedStudentsResponse, Student, UpdateStudentDto,
};
use crate::modules::users::model::{
    ChangePasswordDto, CreateUserDto, PaginatedUsersResponse, UpdateUserDto, User,
};
use crate::utils::pagination::{PaginationMeta, PaginationParams};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::refresh,
        crate::modules::auth::controller::me,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::get_users,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::change_own_password,
        crate::modules::schools::controller::create_school,
        crate::modules::schools::controller::get_schools,
        crate::modules::schools::controller::get_school,
        crate::modules::schools::controller::update_school,
        crate::modules::schools::controller::deactivate_school,
        crate::modules::roles::controller::get_permissions,
        crate::modules::roles::controller::get_permission_by_id,
        crate::modules::roles::controller::create_role,
        crate::modules::roles::controller::get_roles,
        crate::modules::roles::controller::get_role_by_id,
        crate::modules::roles::controller::update_role,
        crate::modules::roles::controller::delete_role,
        crate::modules::roles::controller::assign_permissions,
        crate::modules::roles::controller::remove_permission,
        crate::modules::roles::controller::invite_user,
        crate::modules::roles::controller::accept_invitation,
        crate::modules::roles::controller::revoke_membership,
        crate::modules::roles::controller::get_user_memberships,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::get_students,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::delete_student,
        crate::modules::parents::controller::create_parent,
        crate::modules::parents::controller::get_parents,
        crate::modules::parents::controller::get_parent,
        crate::modules::parents::controller::update_parent,
        crate::modules::parents::controller::delete_parent,
        crate::modules::parents::controller::link_student,
        crate::modules::parents::controller::unlink_student,
    ),
    components(schemas(
        LoginRequest,
        LoginResponse,
        RefreshRequest,
        ProfileResponse,
        MembershipInfo,
        MessageResponse,
        User,
        CreateUserDto,
        UpdateUserDto,
        ChangePasswordDto,
        PaginatedUsersResponse,
        School,
        CreateSchoolDto,
        UpdateSchoolDto,
        PaginatedSchoolsResponse,
        Permission,
        Role,
        RoleWithPermissions,
        SchoolMembership,
        CreateRoleDto,
        UpdateRoleDto,
        AssignPermissionsDto,
        InviteUserDto,
        AcceptInvitationDto,
        PaginatedRolesResponse,
        PaginatedPermissionsResponse,
        Student,
        CreateStudentDto,
        UpdateStudentDto,
        PaginatedStudentsResponse,
        Parent,
        ParentWithStudents,
        CreateParentDto,
        UpdateParentDto,
        LinkStudentDto,
        PaginatedParentsResponse,
        PaginationMeta,
        PaginationParams,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication and session management"),
        (name = "Users", description = "User administration"),
        (name = "Schools", description = "Tenant administration"),
        (name = "Roles", description = "Roles and the permission catalog"),
        (name = "Memberships", description = "School membership and invitations"),
        (name = "Students", description = "Student records"),
        (name = "Parents", description = "Parent records and student links"),
    ),
    info(
        title = "Schoolyard API",
        description = "Multi-tenant school administration API with permission-gated routes"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
