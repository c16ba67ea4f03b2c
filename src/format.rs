//! Response shaping.
//!
//! Backends return raw results; this module turns them into what a notebook
//! displays. Each operation has exactly one rendering.

use serde_json::{json, Value};

use crate::ast::{CommandDescriptor, Operation};

/// Raw result of a dispatched command.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Database or collection names
    Names(Vec<String>),
    /// `find_one`: a document, or none when nothing matched
    Document(Option<Value>),
    /// `find`: the matched documents
    Documents(Vec<Value>),
    /// `count_documents`
    Count(u64),
    /// Status text from session commands
    Message(String),
}

/// Displayable form of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Markdown block
    Markdown(String),
    /// Row-shaped documents for a table
    Rows(Vec<Value>),
    /// Plain status text
    Text(String),
}

/// Render a response for the operation that produced it.
pub fn render(cmd: &CommandDescriptor, response: Response) -> Rendered {
    match (cmd.operation, response) {
        (Operation::ShowDbs, Response::Names(names)) => Rendered::Markdown(format!(
            "#### Databases in `{}`\n***\n{}\n",
            cmd.instance,
            bullet_list(&names)
        )),
        (Operation::ShowCollections, Response::Names(names)) => Rendered::Markdown(format!(
            "#### Collections in `{}` in `{}` instance\n***\n{}\n",
            cmd.database.as_deref().unwrap_or_default(),
            cmd.instance,
            bullet_list(&names)
        )),
        (Operation::Listdbs, Response::Names(names)) => Rendered::Text(format!(
            "List of DBs available on connection:\n{}",
            names.join("\n")
        )),
        (_, Response::Documents(docs)) => Rendered::Rows(docs),
        (_, Response::Document(doc)) => Rendered::Rows(doc.into_iter().collect()),
        (_, Response::Count(count)) => Rendered::Rows(vec![json!({ "count": count })]),
        (_, Response::Message(text)) => Rendered::Text(text),
        (_, Response::Names(names)) => Rendered::Text(names.join("\n")),
    }
}

fn bullet_list(names: &[String]) -> String {
    names.iter().map(|name| format!("* {}\n", name)).collect()
}

/// Column names across rows, in first-seen order.
pub fn columns(rows: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        if let Some(object) = row.as_object() {
            for key in object.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }
    columns
}

/// Cell text for a value in a table.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "NULL".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceForm;
    use pretty_assertions::assert_eq;

    fn cmd(operation: Operation) -> CommandDescriptor {
        CommandDescriptor::new(operation, "prod", SourceForm::Flagged)
    }

    #[test]
    fn test_show_dbs_markdown() {
        let rendered = render(
            &cmd(Operation::ShowDbs),
            Response::Names(vec!["admin".to_string(), "orders".to_string()]),
        );
        assert_eq!(
            rendered,
            Rendered::Markdown("#### Databases in `prod`\n***\n* admin\n* orders\n\n".to_string())
        );
    }

    #[test]
    fn test_show_collections_markdown() {
        let rendered = render(
            &cmd(Operation::ShowCollections).with_database("orders"),
            Response::Names(vec!["invoices".to_string()]),
        );
        assert_eq!(
            rendered,
            Rendered::Markdown(
                "#### Collections in `orders` in `prod` instance\n***\n* invoices\n\n".to_string()
            )
        );
    }

    #[test]
    fn test_find_one_and_count_rows() {
        let doc = json!({"_id": 1});
        assert_eq!(
            render(&cmd(Operation::FindOne), Response::Document(Some(doc.clone()))),
            Rendered::Rows(vec![doc])
        );
        assert_eq!(
            render(&cmd(Operation::FindOne), Response::Document(None)),
            Rendered::Rows(vec![])
        );
        assert_eq!(
            render(&cmd(Operation::CountDocuments), Response::Count(7)),
            Rendered::Rows(vec![json!({"count": 7})])
        );
    }

    #[test]
    fn test_columns_in_first_seen_order() {
        let rows = vec![json!({"_id": 1, "status": "open"}), json!({"_id": 2, "total": 9.5})];
        assert_eq!(columns(&rows), vec!["_id", "status", "total"]);
        assert_eq!(cell_text(rows[0].get("total")), "NULL");
        assert_eq!(cell_text(rows[1].get("total")), "9.5");
    }
}
