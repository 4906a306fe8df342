//! Request validation, run before any storage access.

use models::errors::Violations;
use models::user::{
    validate_date_of_birth, validate_email, validate_gender, validate_id, validate_name, validate_phone_number,
};

use crate::rpc::{
    BlockUserRequest, CreateUserRequest, GetUserRequest, UnblockUserRequest, UpdateContactRequest, UpdateUserRequest,
};

/// Structural and semantic checks of an inbound request. Reports every
/// broken rule, not just the first.
pub trait Validate {
    fn validate(&self) -> Result<(), Violations>;
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), Violations> {
        let mut v = Violations::new();
        v.check("firstName", validate_name(&self.first_name))
            .check("lastName", validate_name(&self.last_name))
            .check("gender", validate_gender(&self.gender))
            .check("dateOfBirth", validate_date_of_birth(&self.date_of_birth))
            .check("phoneNumber", validate_phone_number(&self.phone_number))
            .check("email", validate_email(&self.email));
        v.into_result()
    }
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), Violations> {
        let mut v = Violations::new();
        v.check("id", validate_id(&self.id))
            .check("firstName", validate_name(&self.first_name))
            .check("lastName", validate_name(&self.last_name))
            .check("gender", validate_gender(&self.gender))
            .check("dateOfBirth", validate_date_of_birth(&self.date_of_birth));
        v.into_result()
    }
}

impl Validate for BlockUserRequest {
    fn validate(&self) -> Result<(), Violations> {
        let mut v = Violations::new();
        v.check("id", validate_id(&self.id));
        v.into_result()
    }
}

impl Validate for UnblockUserRequest {
    fn validate(&self) -> Result<(), Violations> {
        let mut v = Violations::new();
        v.check("id", validate_id(&self.id));
        v.into_result()
    }
}

impl Validate for UpdateContactRequest {
    fn validate(&self) -> Result<(), Violations> {
        let mut v = Violations::new();
        v.check("id", validate_id(&self.id))
            .check("phoneNumber", validate_phone_number(&self.phone_number))
            .check("email", validate_email(&self.email));
        v.into_result()
    }
}

impl Validate for GetUserRequest {
    fn validate(&self) -> Result<(), Violations> {
        let mut v = Violations::new();
        if self.phone_number.is_empty() && self.email.is_empty() {
            v.push("phoneNumber", "either phoneNumber or email is required");
        }
        if !self.phone_number.is_empty() {
            v.check("phoneNumber", validate_phone_number(&self.phone_number));
        }
        if !self.email.is_empty() {
            v.check("email", validate_email(&self.email));
        }
        v.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(r: Result<(), Violations>) -> Vec<&'static str> {
        r.err().map(|v| v.fields().iter().map(|f| f.field).collect()).unwrap_or_default()
    }

    #[test]
    fn create_reports_every_missing_field() {
        let got = fields(CreateUserRequest::default().validate());
        assert_eq!(got, vec!["firstName", "lastName", "gender", "dateOfBirth", "phoneNumber", "email"]);
    }

    #[test]
    fn create_accepts_complete_profile() {
        let req = CreateUserRequest {
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            gender: "F".into(),
            date_of_birth: "1990-01-01".into(),
            phone_number: "+1000".into(),
            email: "ann@x.com".into(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn id_must_be_a_uuid() {
        assert_eq!(fields(BlockUserRequest { id: "42".into() }.validate()), vec!["id"]);
        assert_eq!(fields(UnblockUserRequest { id: String::new() }.validate()), vec!["id"]);
        let ok = UnblockUserRequest { id: models::user::new_id() };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn update_contact_checks_formats() {
        let req = UpdateContactRequest { id: models::user::new_id(), phone_number: "12".into(), email: "nope".into() };
        assert_eq!(fields(req.validate()), vec!["phoneNumber", "email"]);
    }

    #[test]
    fn get_needs_one_well_formed_criterion() {
        assert_eq!(fields(GetUserRequest::default().validate()), vec!["phoneNumber"]);
        assert!(GetUserRequest { phone_number: "+1000".into(), email: String::new() }.validate().is_ok());
        assert!(GetUserRequest { phone_number: String::new(), email: "ann@x.com".into() }.validate().is_ok());
        assert_eq!(
            fields(GetUserRequest { phone_number: "+1000".into(), email: "bad".into() }.validate()),
            vec!["email"]
        );
    }
}
