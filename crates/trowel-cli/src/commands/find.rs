use serde::Serialize;
use trowel_core::datastore::Datastore;
use trowel_core::index::{Constraint, Query};

use crate::commands::common::{
    document_to_list_item, format_document_lines, AppContext, DocumentListItem,
};
use crate::error::CliError;

/// Query options as given on the command line
#[derive(Debug, Default)]
pub struct FindArgs {
    pub text: String,
    pub category: Option<String>,
    pub constraints: Vec<String>,
    pub recursive: Vec<String>,
    pub exact: bool,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct FindOutput {
    total: usize,
    documents: Vec<DocumentListItem>,
}

/// Split `NAME=VALUE`; the value may contain further `=`
pub fn parse_constraint(raw: &str) -> Result<(String, String), CliError> {
    let invalid = || CliError::InvalidConstraint(raw.to_string());
    let (name, value) = raw.split_once('=').ok_or_else(invalid)?;
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() || value.is_empty() {
        return Err(invalid());
    }
    Ok((name.to_string(), value.to_string()))
}

pub fn build_query(args: &FindArgs) -> Result<Query, CliError> {
    let mut query = Query::text(args.text.clone());
    query.category = args.category.clone();
    query.exact = args.exact;
    query.limit = args.limit;

    for raw in &args.constraints {
        let (name, value) = parse_constraint(raw)?;
        query.constraints.insert(name, Constraint::from(value));
    }
    for name in &args.recursive {
        let constraint = query
            .constraints
            .get_mut(name)
            .ok_or_else(|| CliError::RecursiveWithoutConstraint(name.clone()))?;
        *constraint = Constraint::descendants_of(constraint.value());
    }
    Ok(query)
}

pub async fn run_find(
    context: &AppContext,
    args: &FindArgs,
    as_json: bool,
) -> Result<(), CliError> {
    let query = build_query(args)?;
    let result = context.datastore.find(&query).await?;

    if as_json {
        let output = FindOutput {
            total: result.total,
            documents: result.documents.iter().map(document_to_list_item).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for line in format_document_lines(&result.documents) {
            println!("{line}");
        }
        if result.total > result.documents.len() {
            println!("({} of {} shown)", result.documents.len(), result.total);
        }
    }

    Ok(())
}
