//! Usage examples for both input surfaces.

use crate::parser::flags::{usage, FlagForm};

/// One usage example.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Example {
    /// `%mongo`, `%%mongo`, or `%%mongo <instance>` for chain input
    pub magic: &'static str,
    pub input: &'static str,
    pub description: &'static str,
}

const EXAMPLES: &[Example] = &[
    Example {
        magic: "%%mongo myinstance",
        input: "use mydb",
        description: "Use the database mydb. All items with db will refer to that db",
    },
    Example {
        magic: "%%mongo myinstance",
        input: "curdb",
        description: "Show the current database that applies to db in your query",
    },
    Example {
        magic: "%%mongo myinstance",
        input: "listdbs",
        description: "List the available databases on the connection",
    },
    Example {
        magic: "%%mongo myinstance",
        input: "db['mycol'].find({'_id': {'$in': ['a', 'b', 'c']}})",
        description: "Run a find command on the current db for the collection mycol",
    },
    Example {
        magic: "%%mongo myinstance",
        input: "c['mydb'].mycol.find_one({'status': 'open'}, {'_id': 0})",
        description: "Find one document in mydb.mycol, hiding _id",
    },
    Example {
        magic: "%mongo",
        input: "show_dbs -i myinstance",
        description: "Show database names in the connection",
    },
    Example {
        magic: "%mongo",
        input: "show_collections -i myinstance -d mydb",
        description: "Show the collections in mydb",
    },
    Example {
        magic: "%%mongo",
        input: "find -i myinstance -d mydb -c mycol\n{\"status\": \"open\"}, {\"_id\": 1, \"status\": 1}",
        description: "Query mycol with a query and a projection filter",
    },
    Example {
        magic: "%%mongo",
        input: "count_documents -i myinstance -d mydb -c mycol\n{}",
        description: "Count the documents in mycol",
    },
];

pub fn examples() -> &'static [Example] {
    EXAMPLES
}

/// The examples as a markdown table.
pub fn markdown_table() -> String {
    let mut out = String::from("| Magic | Description |\n| -------- | ----- |\n");
    for example in EXAMPLES {
        let input = example.input.replace('\n', "<br>");
        out.push_str(&format!(
            "| {}<br>{} | {} |\n",
            example.magic, input, example.description
        ));
    }
    out
}

/// Full help: the example table followed by both flagged grammars.
pub fn full_help() -> String {
    format!(
        "{}\n{}\n{}",
        markdown_table(),
        usage(FlagForm::Line),
        usage(FlagForm::Cell)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{resolve, InputKind};
    use crate::session::SessionDefaults;

    #[test]
    fn test_examples_resolve() {
        let defaults = SessionDefaults::new("myinstance").with_current_database("mydb");
        for example in examples() {
            let kind = match example.magic {
                "%mongo" => InputKind::Line,
                "%%mongo" => InputKind::Cell,
                _ => InputKind::Chain,
            };
            let result = resolve(example.input, kind, &defaults);
            assert!(result.is_ok(), "{}: {:?}", example.input, result);
        }
    }

    #[test]
    fn test_markdown_table() {
        let table = markdown_table();
        assert!(table.starts_with("| Magic | Description |"));
        assert_eq!(table.lines().count(), examples().len() + 2);
    }
}
