//! Branch-minimized response dispatch.
//!
//! Folds `{status -> {mediaType -> body validator}}` into one validator over
//! the `{ status, mediaType, body }` envelope. Branches whose statement equals
//! the computed fallback are pruned, so a response set where many
//! combinations share one body shape stays small.

use indexmap::IndexMap;

use crate::ir::{
    Bound, DispatchArm, DispatchField, FieldValidator, Literal, MediaCase, NumberValidator,
    ResponseDispatch, ResponseStatus, StatusBranch, StatusMatch, UnknownKeys, ValidatorExpr,
};

/// Media type to body validator (`None`: any body) for one status.
pub type MediaValidators = IndexMap<String, Option<ValidatorExpr>>;

const WILDCARD: &str = "*/*";

/// Compile the combined response validator.
pub fn compile_response_dispatch(
    responses: &IndexMap<ResponseStatus, MediaValidators>,
) -> ValidatorExpr {
    let pairs: Vec<(ResponseStatus, &str, &Option<ValidatorExpr>)> = responses
        .iter()
        .flat_map(|(status, media)| {
            media
                .iter()
                .map(move |(media_type, body)| (*status, media_type.as_str(), body))
        })
        .collect();

    match pairs.as_slice() {
        [] => ValidatorExpr::Unknown,
        [(status, media_type, body)] if responses.len() == 1 => {
            envelope(*status, media_type, body)
        }
        _ => ValidatorExpr::Dispatch(Box::new(branch_sequence(responses))),
    }
}

/// Direct object validator for a single (status, mediaType) pair.
fn envelope(status: ResponseStatus, media_type: &str, body: &Option<ValidatorExpr>) -> ValidatorExpr {
    let status = match status {
        ResponseStatus::Code(code) => ValidatorExpr::literal(Literal::Int(i64::from(code))),
        ResponseStatus::Class(class) => {
            let low = f64::from(class) * 100.0;
            ValidatorExpr::Number(NumberValidator {
                integer: true,
                min: Some(Bound::inclusive(low)),
                max: Some(Bound::exclusive(low + 100.0)),
                multiple_of: None,
            })
        }
        ResponseStatus::Default => ValidatorExpr::Number(NumberValidator {
            integer: true,
            ..NumberValidator::default()
        }),
    };
    let media_type = if media_type == WILDCARD {
        ValidatorExpr::string()
    } else {
        ValidatorExpr::literal(Literal::String(media_type.to_string()))
    };
    let field = |name: &str, validator| FieldValidator {
        name: name.to_string(),
        validator,
        optional: false,
    };
    ValidatorExpr::object(
        vec![
            field("status", status),
            field("mediaType", media_type),
            field("body", body.clone().unwrap_or(ValidatorExpr::Unknown)),
        ],
        UnknownKeys::Catchall {
            validator: Box::new(ValidatorExpr::Unknown),
        },
    )
}

fn branch_sequence(responses: &IndexMap<ResponseStatus, MediaValidators>) -> ResponseDispatch {
    let fallback = match responses.get(&ResponseStatus::Default) {
        Some(media) => media_arm(media),
        None => DispatchArm::Reject {
            field: DispatchField::Status,
        },
    };

    let mut exact = Vec::new();
    let mut classes = Vec::new();
    for (status, media) in responses {
        let arm = media_arm(media);
        match *status {
            ResponseStatus::Code(code) => exact.push(StatusBranch {
                status: StatusMatch::Exact(code),
                arm,
            }),
            ResponseStatus::Class(class) if arm != fallback => classes.push(StatusBranch {
                status: StatusMatch::Class(class),
                arm,
            }),
            ResponseStatus::Class(_) | ResponseStatus::Default => {}
        }
    }

    // An exact code equal to the fallback may only go when no surviving class
    // branch would catch it first.
    exact.retain(|branch| {
        let StatusMatch::Exact(code) = branch.status else {
            return true;
        };
        branch.arm != fallback || classes.iter().any(|class| class.status.matches(code))
    });
    exact.extend(classes);

    ResponseDispatch {
        branches: exact,
        fallback,
    }
}

/// Statement for one status: validate directly when every media type shares
/// the fallback, else branch on the media type.
fn media_arm(media: &MediaValidators) -> DispatchArm {
    if media.is_empty() {
        return DispatchArm::Body {
            validator: ValidatorExpr::Unknown,
        };
    }

    let fallback = match media.get(WILDCARD) {
        Some(body) => DispatchArm::Body {
            validator: body.clone().unwrap_or(ValidatorExpr::Unknown),
        },
        None => DispatchArm::Reject {
            field: DispatchField::MediaType,
        },
    };

    let cases: Vec<MediaCase> = media
        .iter()
        .filter(|(media_type, _)| media_type.as_str() != WILDCARD)
        .map(|(media_type, body)| MediaCase {
            media_type: media_type.clone(),
            validator: body.clone().unwrap_or(ValidatorExpr::Unknown),
        })
        .filter(|case| {
            !matches!(&fallback, DispatchArm::Body { validator } if *validator == case.validator)
        })
        .collect();

    if cases.is_empty() {
        fallback
    } else {
        DispatchArm::Media {
            cases,
            fallback: Box::new(fallback),
        }
    }
}
