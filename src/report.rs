use unicode_width::UnicodeWidthStr;

use crate::diagnostics::Diagnostics;
use crate::schema::DerivedSchema;

const GAP: usize = 2;

/// Column-aligned text table. Widths are display widths, so wide
/// characters in class names still line up.
#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.width()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.width());
                } else {
                    widths.push(cell.width());
                }
            }
        }
        widths
    }

    fn line(cells: &[String], widths: &[usize]) -> String {
        let mut out = String::new();
        for (i, cell) in cells.iter().enumerate() {
            out.push_str(cell);
            if i + 1 < cells.len() {
                let pad = widths[i] - cell.width() + GAP;
                out.extend(std::iter::repeat_n(' ', pad));
            }
        }
        out.trim_end().to_string()
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let mut out = Self::line(&self.headers, &widths);
        out.push('\n');
        let rule: usize = widths.iter().sum::<usize>() + GAP * widths.len().saturating_sub(1);
        out.push_str(&"-".repeat(rule));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&Self::line(row, &widths));
            out.push('\n');
        }
        out
    }
}

/// One row per field: identifier, declared attributes, then foreign keys.
pub fn schema_table(schema: &DerivedSchema) -> Table {
    let mut table = Table::new(["class", "field", "type", "references", "on delete"]);
    for class in &schema.classes {
        let label = match &class.associates {
            Some(_) => format!("{} (junction)", class.name),
            None => class.name.clone(),
        };
        table.row([label.as_str(), "id", "identifier", "", ""]);
        for attribute in &class.attributes {
            table.row(["", attribute.name.as_str(), attribute.primitive_type.as_str(), "", ""]);
        }
        for fk in &class.foreign_keys {
            let on_delete = if fk.on_delete_cascade { "cascade" } else { "" };
            table.row([
                "",
                fk.field_name.as_str(),
                "key",
                fk.referenced_class.as_str(),
                on_delete,
            ]);
        }
    }
    table
}

pub fn render(schema: &DerivedSchema, diagnostics: &Diagnostics) -> String {
    let mut out = schema_table(schema).render();
    if !diagnostics.is_empty() {
        out.push('\n');
        for diagnostic in diagnostics.iter() {
            out.push_str(&diagnostic.to_string());
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Diagram;
    use crate::schema;

    #[test]
    fn test_alignment() {
        let mut table = Table::new(["a", "b"]);
        table.row(["long value", "x"]);
        table.row(["s", "y"]);
        assert_eq!(table.render(), "a           b\n-------------\nlong value  x\ns           y\n");
    }

    #[test]
    fn test_wide_characters() {
        let mut table = Table::new(["name", "n"]);
        table.row(["ユーザー", "1"]);
        // 4 wide chars occupy 8 columns
        assert_eq!(table.render().lines().nth(2), Some("ユーザー  1"));
        assert_eq!(table.render().lines().next(), Some("name      n"));
    }

    #[test]
    fn test_schema_rows() {
        let (diagram, mut diags) = Diagram::parse(
            r#"
            class Person { name String }
            class Employee { salary Float }
            rel { Employee 1 -- 1 Person : inheritance }
            "#,
        )
        .unwrap();
        let schema = schema::derive(&diagram, &mut diags);
        let out = render(&schema, &diags);
        let key = out.lines().find(|l| l.contains("personId")).unwrap();
        assert!(key.contains("Person"));
        assert!(key.ends_with("cascade"));
        assert!(out.contains("salary"));
        assert!(out.contains("Real"));
    }
}
