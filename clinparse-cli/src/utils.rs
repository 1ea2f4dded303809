use crate::args::ParseArgs;
use clinparse::ClinparseError;
use clinparse::models::{AttributeFocus, ConceptFocus, FocusRequest};
use clinparse::pipeline::{BatchDocument, ParseRequest};
use std::fs;

/// `DESTINATION:ORIGIN` into an attribute focus keyed by the argument itself.
///
/// The destination side matches descendants too.
pub fn parse_attribute_focus(value: &str) -> clinparse::Result<AttributeFocus> {
    let Some((destination, origin)) = value.split_once(':') else {
        return Err(ClinparseError::Other(format!(
            "Invalid attribute focus '{}': expected DESTINATION:ORIGIN",
            value
        )));
    };

    let (destination, origin) = (destination.trim(), origin.trim());
    if destination.is_empty() || origin.is_empty() {
        return Err(ClinparseError::Other(format!(
            "Invalid attribute focus '{}': both concept ids are required",
            value
        )));
    }

    Ok(AttributeFocus {
        id: value.to_string(),
        destination_id: destination.to_string(),
        origin_id: origin.to_string(),
        match_children: true,
    })
}

/// Focus targets from the focus file and flags, in that order.
pub fn build_focus(args: &ParseArgs) -> clinparse::Result<FocusRequest> {
    let mut focus = match &args.focus_file {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|e| {
                ClinparseError::Other(format!("Failed to read focus file {}: {}", path.display(), e))
            })?;
            serde_json::from_str::<FocusRequest>(&content)
                .map_err(|e| ClinparseError::Other(format!("Invalid focus file: {}", e)))?
        }
        None => FocusRequest::default(),
    };

    for code in &args.focus {
        focus.concepts.push(ConceptFocus {
            id: code.clone(),
            concept_id: code.clone(),
            match_self: true,
            match_children: false,
        });
    }
    for code in &args.focus_children {
        focus.concepts.push(ConceptFocus {
            id: format!("{}+", code),
            concept_id: code.clone(),
            match_self: true,
            match_children: true,
        });
    }
    for value in &args.focus_attributes {
        focus.attributes.push(parse_attribute_focus(value)?);
    }

    Ok(focus)
}

pub fn build_request(args: &ParseArgs) -> clinparse::Result<ParseRequest> {
    let mut request = ParseRequest::default().with_focus(build_focus(args)?);
    if !args.include.is_empty() {
        request = request.with_included_ancestors(args.include.clone());
    }
    Ok(request)
}

/// One document per file, named by its path.
pub fn read_documents(args: &ParseArgs) -> clinparse::Result<Vec<BatchDocument>> {
    args.files
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path).map_err(|e| {
                ClinparseError::Other(format!("Failed to read {}: {}", path.display(), e))
            })?;
            Ok(BatchDocument::new(path.display().to_string(), text))
        })
        .collect()
}
