pub mod body;
pub mod header;

use dom_query::Document;

use crate::store::{VoteBallot, VoteHeader};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("header block has {found} lines, expected 6")]
    MalformedHeader { found: usize },
    #[error("unrecognised sequence line: {0:?}")]
    MalformedSequenceLine(String),
    #[error("unrecognised tally line: {0:?}")]
    MalformedTally(String),
}

pub struct ParsedVote {
    pub header: VoteHeader,
    pub ballots: Vec<VoteBallot>,
}

/// Header and ballots of one roll-call page. No header, no result.
pub fn parse_document(html: &str) -> Result<ParsedVote, ParseError> {
    let doc = Document::from(html);
    let header = header::extract(&doc)?;
    let ballots = body::extract(&doc);
    Ok(ParsedVote { header, ballots })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn vote_7_header() {
        let v = parse_document(&fixture("vote_7")).unwrap();
        let h = &v.header;
        assert_eq!(h.session, "1 сесія\u{a0}\u{a0}9 скликання");
        assert_eq!(h.kind, "РЕЗУЛЬТАТИ ПОІМЕННОГО ГОЛОСУВАННЯ");
        assert_eq!(h.doc_number, "7");
        assert_eq!(h.date, "29.08.2019");
        assert_eq!(h.time, "14:54:57");
        assert_eq!(
            h.title,
            "Поіменне голосування про проект Постанови про Тимчасову президію (№1001) - за основу та в цілому"
        );
        assert_eq!((h.yay, h.nay, h.abstain, h.did_not_vote, h.total), (3, 1, 0, 1, 5));
        assert_eq!(h.result, "Рішення прийнято");
    }

    #[test]
    fn vote_7_ballots() {
        let v = parse_document(&fixture("vote_7")).unwrap();
        let names: Vec<&str> = v.ballots.iter().map(|b| b.member_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Аліксійчук О.В.", "Аллахвердієва І.В.", "Ананченко М.О.", "Андрійович З.М.", "Урбанський А.І."]
        );
        assert_eq!(v.ballots[2].choice, "Проти");
        assert_eq!(v.ballots[4].choice, "Не голосував");
    }

    #[test]
    fn page_without_header_fails() {
        let html = r#"<table><tr><td class="hcol1">A</td><td>За</td></tr></table>"#;
        assert!(matches!(
            parse_document(html),
            Err(ParseError::MalformedHeader { found: 0 })
        ));
    }
}
