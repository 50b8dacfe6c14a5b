use dom_query::Document;

use crate::store::VoteBallot;

const NAME_CLASS: &str = "hcol1";

/// Member ballots in page order.
///
/// Each `td.hcol1` name cell pairs with the next attribute-less `td` after it.
/// Name cells seen while a pair is still open are skipped. There is no check
/// that the cells belong to the voting table.
pub fn extract(doc: &Document) -> Vec<VoteBallot> {
    let mut ballots = Vec::new();
    let mut pending: Option<String> = None;

    for cell in doc.select("td").iter() {
        if cell.has_class(NAME_CLASS) {
            if pending.is_none() {
                pending = Some(cell.text().trim().to_string());
            }
            continue;
        }
        let plain = cell.nodes().first().is_some_and(|n| n.attrs().is_empty());
        if !plain {
            continue;
        }
        if let Some(member_name) = pending.take() {
            ballots.push(VoteBallot {
                member_name,
                choice: cell.text().trim().to_string(),
            });
        }
    }

    ballots
}
