//! Labelled multi-record text (`.smi` style) for bulk input and output.
//!
//! Each non-blank, non-comment line holds a notation and an optional label separated by
//! whitespace. Records that fail to parse stay in the collection as absent entries so the
//! item count always matches the record count.

use super::{Error, Notation};
use crate::model::{collection::Collection, slot::Slot, structure::Structure};
use std::io::{BufRead, Write};

const FORMAT: &str = "SMI";

/// One raw record of a labelled structure listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub notation: String,
    pub label: Option<String>,
    pub line_number: usize,
}

/// Splits text into records without parsing the notations.
///
/// # Errors
///
/// Returns [`Error::InvalidRecord`] for a line with more than two fields and
/// [`Error::Io`] when the reader fails.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<Record>, Error> {
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::from_io(e, None))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let line_number = idx + 1;
        match fields.as_slice() {
            [notation] => records.push(Record {
                notation: notation.to_string(),
                label: None,
                line_number,
            }),
            [notation, label] => records.push(Record {
                notation: notation.to_string(),
                label: Some(label.to_string()),
                line_number,
            }),
            _ => {
                return Err(Error::invalid_record(
                    FORMAT,
                    line_number,
                    format!("expected 'NOTATION [LABEL]', found {} fields", fields.len()),
                ));
            }
        }
    }

    Ok(records)
}

/// Parses records into a collection; unlabelled records are labelled by their 0-based index.
pub fn build_collection(records: &[Record], notation: &dyn Notation) -> Collection {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let label = record.label.clone().unwrap_or_else(|| idx.to_string());
            let slot: Slot<Structure> = notation.parse(&record.notation).into();
            (label, slot)
        })
        .collect()
}

/// Reads a labelled listing into a [`Collection`].
pub fn read<R: BufRead>(reader: R, notation: &dyn Notation) -> Result<Collection, Error> {
    let records = read_records(reader)?;
    Ok(build_collection(&records, notation))
}

/// Writes labelled structure slots, one `NOTATION<TAB>LABEL` line each; absent slots use `*`.
pub fn write<'a, W, I>(mut writer: W, items: I, notation: &dyn Notation) -> Result<(), Error>
where
    W: Write,
    I: IntoIterator<Item = (&'a str, Slot<&'a Structure>)>,
{
    for (label, slot) in items {
        let text = match slot {
            Slot::Filled(structure) => notation.write(structure),
            Slot::Absent(_) => "*".to_string(),
        };
        writeln!(writer, "{}\t{}", text, label).map_err(|e| Error::from_io(e, None))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Smiles;

    #[test]
    fn reads_labelled_and_unlabelled_records() {
        let text = "# header\nCC ethane\n\nCCO\n";
        let collection = read(text.as_bytes(), &Smiles).unwrap();

        let labels: Vec<_> = collection.labels().iter().map(|l| l.to_string()).collect();
        assert_eq!(labels, vec!["ethane", "1"]);
        assert_eq!(collection.filled_count(), 2);
    }

    #[test]
    fn unparseable_records_become_absent_entries() {
        let text = "CC a\nC(C b\nO c\n";
        let collection = read(text.as_bytes(), &Smiles).unwrap();

        assert_eq!(collection.len(), 3);
        assert!(collection.entries()[1].structure.is_absent());
        assert!(
            collection.entries()[1]
                .structure
                .absence()
                .unwrap()
                .reason
                .contains("unclosed branch")
        );
    }

    #[test]
    fn rejects_records_with_extra_fields() {
        let err = read_records("CC a b\n".as_bytes()).unwrap_err();

        assert!(matches!(err, Error::InvalidRecord { line_number: 1, .. }));
    }

    #[test]
    fn writes_absent_slots_as_placeholders() {
        let ethane = Smiles.parse("CC").unwrap();
        let mut out = Vec::new();

        write(
            &mut out,
            vec![("a", Slot::Filled(&ethane)), ("b", Slot::absent("rejected"))],
            &Smiles,
        )
        .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "CC\ta\n*\tb\n");
    }
}
