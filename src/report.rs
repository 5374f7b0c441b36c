//! Plain-text report of a model descriptor.

use unicode_width::UnicodeWidthStr;

use crate::field::Field;
use crate::generator::ModelDescriptor;

/// Render `descriptor` as an aligned text report.
pub fn render(descriptor: &ModelDescriptor) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} (table: {}, primary key: {})\n",
        descriptor.model.name,
        descriptor.table_name,
        descriptor.primary_key.as_deref().unwrap_or("-")
    ));

    if !descriptor.fields.is_empty() {
        output.push_str("\nFields\n");
        let rows: Vec<[String; 3]> = descriptor
            .fields
            .iter()
            .map(|f| [f.name.clone(), f.db_input.clone(), field_flags(f)])
            .collect();
        write_table(&mut output, &rows);
    }

    if !descriptor.relations.is_empty() {
        output.push_str("\nRelationships\n");
        let rows: Vec<[String; 3]> = descriptor
            .relations
            .iter()
            .map(|r| {
                [
                    r.method_name.clone(),
                    r.relation_class.clone(),
                    format!(
                        "$this->{}({}::class{}){}",
                        r.relation, r.related_model, r.input_fields, r.method_chain
                    ),
                ]
            })
            .collect();
        write_table(&mut output, &rows);
    }

    if !descriptor.warnings.is_empty() {
        output.push_str("\nWarnings\n");
        for warning in &descriptor.warnings {
            output.push_str(&format!("  - {warning}\n"));
        }
    }

    output
}

fn field_flags(field: &Field) -> String {
    let mut flags = Vec::new();
    if field.is_primary {
        flags.push("primary");
    }
    if field.is_unique {
        flags.push("unique");
    }
    if field.is_fillable {
        flags.push("fillable");
    }
    if field.is_searchable {
        flags.push("searchable");
    }
    flags.join(",")
}

fn write_table(output: &mut String, rows: &[[String; 3]]) {
    let mut widths = [0usize; 3];
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(UnicodeWidthStr::width(cell.as_str()));
        }
    }

    for row in rows {
        output.push_str("  ");
        for (i, cell) in row.iter().enumerate() {
            output.push_str(cell);
            if i + 1 < row.len() {
                let pad = widths[i] - UnicodeWidthStr::width(cell.as_str());
                output.push_str(&" ".repeat(pad + 2));
            }
        }
        // Empty trailing cells leave padding behind
        while output.ends_with(' ') {
            output.pop();
        }
        output.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::generator::Generator;

    #[test]
    fn test_render_fields_file_model() {
        let json = r#"[
            {"name": "id", "dbType": "increments", "primary": true, "fillable": false},
            {"name": "título", "dbType": "string,100", "searchable": true},
            {"type": "relation", "relation": "mt1,User,author_id"},
            {"type": "relation", "relation": "xyz,Tag"}
        ]"#;
        let post = Generator::from_fields_file(json, "Post", &GeneratorConfig::default()).unwrap();
        let report = render(&post);

        let expected = "\
Post (table: posts, primary key: id)

Fields
  id      increments  primary
  título  string,100  fillable,searchable

Relationships
  author  BelongsTo  $this->belongsTo(User::class, 'author_id')

Warnings
  - relation `xyz,Tag` dropped: Unsupported relationship type `xyz` (expected 1t1, 1tm, mt1, mtm or hmt)
";
        assert_eq!(report, expected);
    }

    #[test]
    fn test_wide_characters_align() {
        let mut output = String::new();
        let rows = vec![
            ["ユーザー".to_string(), "a".to_string(), "x".to_string()],
            ["id".to_string(), "b".to_string(), "y".to_string()],
        ];
        write_table(&mut output, &rows);
        assert_eq!(output, "  ユーザー  a  x\n  id        b  y\n");
    }
}
