use std::sync::LazyLock;

use dom_query::Document;
use regex::Regex;

use super::ParseError;
use crate::store::VoteHeader;

const HEADER_BLOCK: &str = "td.f2";

// "№ 7 від 29.08.2019 14:54:57"
static SEQUENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\D*?(\d+)\s.*?(\d+\.\d+\.\d+)\s+(\d+:\d+:\d+)").unwrap()
});

// "За - 311 Проти - 6 Утрималися - 6 Не голосували - 95 Всього - 418"
static TALLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"За\s*-\s*(\d+)\s+Проти\s*-\s*(\d+)\s+Утрималися\s*-\s*(\d+)\s+Не голосували\s*-\s*(\d+)\s+Всього\s*-\s*(\d+)",
    )
    .unwrap()
});

#[derive(Debug)]
pub struct SequenceLine {
    pub doc_number: String,
    pub date: String,
    pub time: String,
}

#[derive(Debug)]
pub struct Tally {
    pub yay: u32,
    pub nay: u32,
    pub abstain: u32,
    pub did_not_vote: u32,
    pub total: u32,
}

pub fn extract(doc: &Document) -> Result<VoteHeader, ParseError> {
    parse_lines(&header_lines(doc))
}

/// Text of the header block, one entry per `<br>`-separated line.
/// ASCII whitespace runs collapse to one space; blank lines are dropped.
pub fn header_lines(doc: &Document) -> Vec<String> {
    let block = doc.select(HEADER_BLOCK);
    let Some(root) = block.nodes().first() else {
        return Vec::new();
    };

    let mut raw = String::new();
    for node in root.descendants() {
        if node.is_text() {
            // Source newlines are plain whitespace; only <br> breaks a line.
            raw.extend(
                node.text()
                    .chars()
                    .map(|c| if c.is_ascii_whitespace() { ' ' } else { c }),
            );
        } else if node
            .node_name()
            .is_some_and(|name| name.eq_ignore_ascii_case("br"))
        {
            raw.push('\n');
        }
    }

    raw.split('\n')
        .map(|line| line.split_ascii_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

pub fn parse_lines(lines: &[String]) -> Result<VoteHeader, ParseError> {
    let [session, kind, sequence, title, tally, result] = lines else {
        return Err(ParseError::MalformedHeader { found: lines.len() });
    };

    let seq = parse_sequence_line(sequence)?;
    let t = parse_tally_line(tally)?;

    Ok(VoteHeader {
        session: session.clone(),
        kind: kind.clone(),
        doc_number: seq.doc_number,
        date: seq.date,
        time: seq.time,
        title: title.clone(),
        yay: t.yay,
        nay: t.nay,
        abstain: t.abstain,
        did_not_vote: t.did_not_vote,
        total: t.total,
        result: result.clone(),
    })
}

pub fn parse_sequence_line(line: &str) -> Result<SequenceLine, ParseError> {
    let caps = SEQUENCE_RE
        .captures(line)
        .ok_or_else(|| ParseError::MalformedSequenceLine(line.to_string()))?;
    Ok(SequenceLine {
        doc_number: caps[1].to_string(),
        date: caps[2].to_string(),
        time: caps[3].to_string(),
    })
}

/// The counts are taken as published; they are not checked against each other.
pub fn parse_tally_line(line: &str) -> Result<Tally, ParseError> {
    let malformed = || ParseError::MalformedTally(line.to_string());
    let caps = TALLY_RE.captures(line).ok_or_else(malformed)?;
    let n = |i: usize| caps[i].parse::<u32>().map_err(|_| malformed());
    Ok(Tally {
        yay: n(1)?,
        nay: n(2)?,
        abstain: n(3)?,
        did_not_vote: n(4)?,
        total: n(5)?,
    })
}
