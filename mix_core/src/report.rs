//! # Print View
//!
//! Renders a scaled mix as a standalone HTML page for printing. Columns are
//! fixed in this order:
//!
//! | A | Material | B | A+B Kg | A+B% | A% | B% |
//!
//! Weights are shown with two decimals and percentages with one. Only the
//! numbers and column meaning are stable; markup may change.
//!
//! ## Example
//!
//! ```rust
//! use mix_core::calculations::{scale_to_quantity, MixTable};
//! use mix_core::report::render_print_html;
//!
//! let mut table = MixTable::new();
//! table.add_row("HDPE", 75.0, 100.0)?;
//! let scaled = scale_to_quantity(table.rows(), 350.0)?;
//!
//! let html = render_print_html("Job 1042", &scaled);
//! assert!(html.contains("<td>HDPE</td>"));
//! # Ok::<(), mix_core::errors::CalcError>(())
//! ```

use chrono::Utc;

use crate::calculations::scaling::ScaledMix;

/// Column headers in print order
pub const COLUMNS: [&str; 7] = ["A", "Material", "B", "A+B Kg", "A+B%", "A%", "B%"];

const STYLE: &str = r#"
body { font-family: Arial, sans-serif; margin: 24px; }
h1 { font-size: 18px; margin-bottom: 4px; }
.meta { color: #555; font-size: 12px; margin-bottom: 12px; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #333; padding: 4px 8px; text-align: right; }
td:nth-child(2), th:nth-child(2) { text-align: left; }
tfoot td { font-weight: bold; }
@media print { body { margin: 0; } }
"#;

/// Render `mix` as a printable HTML document titled `title`.
pub fn render_print_html(title: &str, mix: &ScaledMix) -> String {
    let mut html = String::new();
    let title = escape_html(title);

    html.push_str(&format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n"
    ));
    html.push_str(&format!("<h1>{}</h1>\n", title));
    html.push_str(&format!(
        "<div class=\"meta\">Quantity: {:.2} kg &middot; Scale factor: {:.4} &middot; Printed {}</div>\n",
        mix.target_quantity_kg,
        mix.scale_factor,
        Utc::now().format("%Y-%m-%d %H:%M UTC")
    ));

    html.push_str("<table>\n<thead><tr>");
    for column in COLUMNS {
        html.push_str(&format!("<th>{}</th>", column));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for row in &mix.rows {
        html.push_str(&format!(
            "<tr><td>{:.2}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.1}%</td><td>{:.1}%</td><td>{:.1}%</td></tr>\n",
            row.scaled_a_kg,
            escape_html(&row.material),
            row.scaled_b_kg,
            row.scaled_total_kg,
            row.total_percentage,
            row.a_percentage,
            row.b_percentage,
        ));
    }

    html.push_str("</tbody>\n<tfoot>\n");
    html.push_str(&format!(
        "<tr><td>{:.2}</td><td>Total</td><td>{:.2}</td><td>{:.2}</td><td>100.0%</td><td>{:.1}%</td><td>{:.1}%</td></tr>\n",
        mix.total_a_kg,
        mix.total_b_kg,
        mix.total_a_kg + mix.total_b_kg,
        mix.a_percentage,
        mix.b_percentage,
    ));
    html.push_str("</tfoot>\n</table>\n</body>\n</html>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
