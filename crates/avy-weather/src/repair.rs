//! Markup fixes applied before parsing.
//!
//! The ridgeline winds table on the forecast page leaves most of its rows
//! unclosed: a `</td>` is followed directly by the next `<tr>` or by
//! `</table>`.

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static CELL_THEN_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</td>[ \n]*<tr>").expect("literal pattern"));

#[allow(clippy::expect_used)]
static CELL_THEN_TABLE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</td>[ \n]*</table>").expect("literal pattern"));

/// Insert the `</tr>` tags the forecast page omits
pub fn close_unterminated_rows(html: &str) -> String {
    let rows = CELL_THEN_ROW.replace_all(html, "</td></tr><tr>");
    let fixed = CELL_THEN_TABLE_END
        .replace_all(&rows, "</td></tr></table>")
        .into_owned();
    fixed
}
