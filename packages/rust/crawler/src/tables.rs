//! HTML table extraction into raw row batches.
//!
//! The registration site renders every list as a `table.table`. Column headers
//! are `th[scope=col]`; the general table keeps its values in `td` cells while
//! participant tables put every value in a `th[scope=row]` cell.

use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use rosterwatch_shared::{Result, RosterwatchError, Row, RowBatch};

/// The general-information page: its category table and the sub-source links in it.
#[derive(Debug, Clone)]
pub struct GeneralPage {
    /// Header row followed by one row of `td` cells per category.
    pub table: RowBatch,
    /// Sub-source links in document order, resolved against the page URL.
    pub links: Vec<Url>,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("built-in selector")
}

/// Locate the first `table.table` in the document.
fn find_table<'a>(doc: &'a Html, source: &str) -> Result<ElementRef<'a>> {
    doc.select(&selector("table.table"))
        .next()
        .ok_or_else(|| RosterwatchError::parse(format!("{source}: no table.table found")))
}

/// Text of a cell with `<br>` turned into line breaks, trimmed.
fn cell_text(cell: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in cell.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn header_row(table: ElementRef<'_>) -> Row {
    table
        .select(&selector(r#"th[scope="col"]"#))
        .map(cell_text)
        .collect()
}

/// Parse the general-information page.
pub fn parse_general_page(html: &str, page_url: &Url) -> Result<GeneralPage> {
    let doc = Html::parse_document(html);
    let table = find_table(&doc, page_url.as_str())?;

    let td = selector("td");
    let mut rows = vec![header_row(table)];
    for tr in table.select(&selector("tr")) {
        let cells: Row = tr.select(&td).map(cell_text).collect();
        if !cells.is_empty() {
            rows.push(cells);
        }
    }

    let data_markers = table.select(&selector(r#"th[scope="row"]"#)).count();

    let mut links = Vec::new();
    for a in table.select(&selector("a[href]")) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        match page_url.join(href) {
            Ok(url) => links.push(url),
            Err(e) => tracing::warn!(href, error = %e, "skipping unresolvable link"),
        }
    }

    Ok(GeneralPage {
        table: RowBatch {
            source: page_url.to_string(),
            rows,
            data_markers,
        },
        links,
    })
}

/// Parse one participant sub-source page into a row batch.
///
/// The header row is always the first row, even if the page declares no headers.
pub fn parse_sub_source(html: &str, source: &str) -> Result<RowBatch> {
    let doc = Html::parse_document(html);
    let table = find_table(&doc, source)?;

    let row_cell = selector(r#"th[scope="row"]"#);
    let mut rows = vec![header_row(table)];
    let mut data_markers = 0;
    for tr in table.select(&selector("tr")) {
        let cells: Row = tr.select(&row_cell).map(cell_text).collect();
        if !cells.is_empty() {
            data_markers += cells.len();
            rows.push(cells);
        }
    }

    Ok(RowBatch {
        source: source.to_string(),
        rows,
        data_markers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERAL_HTML: &str = r#"<html><body>
        <table class="table">
          <tr><th scope="col">#</th><th scope="col">Категория</th><th scope="col">Дата</th><th scope="col">Город</th></tr>
          <tr><th scope="row">1</th><td><a href="/reg/1">Waltz</a></td><td>12.03</td><td>Саратов</td></tr>
          <tr><th scope="row">2</th><td><a href="https://other.example.com/reg/2">Tango</a></td><td>20.04</td><td>Энгельс</td></tr>
        </table>
    </body></html>"#;

    const SUB_SOURCE_HTML: &str = r#"<html><body>
        <table class="table">
          <tr><th scope="col">№</th><th scope="col">Участники</th><th scope="col">Клуб</th><th scope="col">Тренер</th></tr>
          <tr><th scope="row">1</th><th scope="row">Иван Петров<br>Анна Смирнова</th><th scope="row">Вега</th><th scope="row">Орлов</th></tr>
          <tr><th scope="row">2</th><th scope="row">Олег Ким<br/>Мария Ли</th><th scope="row">Вега</th><th scope="row">Орлов</th></tr>
        </table>
    </body></html>"#;

    #[test]
    fn general_page_rows_and_links() {
        let base = Url::parse("https://dance.example.com/reg_module/?mode=reglists").unwrap();
        let page = parse_general_page(GENERAL_HTML, &base).unwrap();

        assert_eq!(page.table.rows.len(), 3);
        assert_eq!(page.table.rows[0], vec!["#", "Категория", "Дата", "Город"]);
        assert_eq!(page.table.rows[1], vec!["Waltz", "12.03", "Саратов"]);
        assert_eq!(page.table.data_markers, 2);

        let links: Vec<&str> = page.links.iter().map(Url::as_str).collect();
        assert_eq!(
            links,
            vec![
                "https://dance.example.com/reg/1",
                "https://other.example.com/reg/2"
            ]
        );
    }

    #[test]
    fn sub_source_counts_markers_and_splits_br() {
        let batch = parse_sub_source(SUB_SOURCE_HTML, "waltz").unwrap();

        assert_eq!(batch.rows.len(), 3);
        assert_eq!(batch.data_markers, 8);
        assert_eq!(batch.rows[1][1], "Иван Петров\nАнна Смирнова");
        assert_eq!(batch.rows[2][1], "Олег Ким\nМария Ли");
    }

    #[test]
    fn missing_table_is_parse_error() {
        let err = parse_sub_source("<html><body><p>closed</p></body></html>", "x").unwrap_err();
        assert!(matches!(err, RosterwatchError::Parse { .. }));
    }
}
