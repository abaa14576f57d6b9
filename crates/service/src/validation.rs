//! Input checks shared by the services.

use crate::{ServiceError, ServiceResult};

/// Ghanaian mobile numbers: `+233` followed by nine digits.
pub fn validate_phone(phone: &str) -> ServiceResult<()> {
    let valid = phone
        .strip_prefix("+233")
        .map(|rest| rest.len() == 9 && rest.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "Invalid phone number {:?}: expected +233 followed by 9 digits",
            phone
        )))
    }
}

/// A pragmatic `local@domain.tld` check.
pub fn validate_email(email: &str) -> ServiceResult<()> {
    let local_ok = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
    };
    let domain_ok = |s: &str| {
        let Some((host, tld)) = s.rsplit_once('.') else {
            return false;
        };
        !host.is_empty()
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
            && tld.len() >= 2
            && tld.chars().all(|c| c.is_ascii_alphabetic())
    };

    let valid = match email.split_once('@') {
        Some((local, domain)) => local_ok(local) && domain_ok(domain),
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!("Invalid email address {:?}", email)))
    }
}

/// Pagination bounds: `page >= 1`, `1 <= page_size <= 100`.
pub fn validate_paging(page: i64, page_size: i64) -> ServiceResult<()> {
    if page < 1 {
        return Err(ServiceError::Validation("page must be at least 1".to_string()));
    }
    if !(1..=100).contains(&page_size) {
        return Err(ServiceError::Validation(
            "page_size must be between 1 and 100".to_string(),
        ));
    }
    Ok(())
}
