//! Writes decks to an Anki `.apkg` package: a zip holding a schema-11 `collection.anki2`
//! SQLite database and an empty `media` manifest.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use serde_json::{json, Value};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::decks::DeckMap;
use crate::error::AppError;

pub mod ids;

use ids::{field_checksum, note_guid, stable_id, stable_wide_id};

const COLLECTION_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/sql/anki_collection_v11.sql"
));

const FIELD_SEPARATOR: char = '\u{1f}';
const CARD_CSS: &str = ".card { font-family: arial; font-size: 16px; text-align: left; }";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSummary {
    pub path: PathBuf,
    pub decks: usize,
    pub notes: usize,
}

/// Build an `.apkg` at `out_path` from `decks`. `now_secs` stamps modification times; ids
/// derive only from deck names and card content, so repeated runs produce identical ids.
///
/// Decks sharing a name share an id and land in the same Anki deck.
pub fn build_apkg(decks: &DeckMap, out_path: &Path, now_secs: i64) -> Result<PackageSummary, AppError> {
    if decks.total_cards() == 0 {
        return Err(AppError::new("PACKAGE_EMPTY", "No cards to package"));
    }

    let db_path = out_path.with_extension("anki2.tmp");
    if db_path.exists() {
        fs::remove_file(&db_path).map_err(|e| package_failed("Failed to clear temp collection", e))?;
    }

    let built = build_collection(&db_path, decks, now_secs);
    let _ = fs::remove_file(&db_path);
    let (notes, collection) = built?;

    write_zip(out_path, &collection)?;

    let summary = PackageSummary {
        path: out_path.to_path_buf(),
        decks: decks.len(),
        notes,
    };
    info!(path = %out_path.display(), decks = summary.decks, notes, "wrote anki package");
    Ok(summary)
}

fn build_collection(db_path: &Path, decks: &DeckMap, now_secs: i64) -> Result<(usize, Vec<u8>), AppError> {
    let mut conn = Connection::open(db_path)
        .map_err(|e| package_failed("Failed to open collection database", e))?;
    let notes = write_collection(&mut conn, decks, now_secs)?;
    conn.close()
        .map_err(|(_, e)| package_failed("Failed to close collection database", e))?;
    let bytes = fs::read(db_path).map_err(|e| package_failed("Failed to read collection database", e))?;
    Ok((notes, bytes))
}

fn write_collection(conn: &mut Connection, decks: &DeckMap, now_secs: i64) -> Result<usize, AppError> {
    conn.execute_batch(COLLECTION_SCHEMA)
        .map_err(|e| package_failed("Failed to create collection schema", e))?;

    let tx = conn
        .transaction()
        .map_err(|e| package_failed("Failed to begin collection transaction", e))?;

    let mut models = serde_json::Map::new();
    let mut deck_entries = serde_json::Map::new();
    deck_entries.insert("1".to_string(), deck_json(1, "Default", 0));
    for deck in decks {
        let did = stable_id("deck", &deck.name);
        let mid = stable_id("model", &deck.name);
        deck_entries
            .entry(did.to_string())
            .or_insert_with(|| deck_json(did, &deck.name, now_secs));
        models
            .entry(mid.to_string())
            .or_insert_with(|| model_json(mid, did, &deck.name, now_secs));
    }

    tx.execute(
        "INSERT INTO col (id, crt, mod, scm, ver, dty, usn, ls, conf, models, decks, dconf, tags)
         VALUES (1, ?1, ?2, ?2, 11, 0, 0, 0, ?3, ?4, ?5, ?6, '{}')",
        params![
            now_secs,
            now_secs * 1000,
            collection_conf_json().to_string(),
            Value::Object(models).to_string(),
            Value::Object(deck_entries).to_string(),
            deck_conf_json().to_string(),
        ],
    )
    .map_err(|e| package_failed("Failed to write collection row", e))?;

    let mut used_ids: HashSet<i64> = HashSet::new();
    let mut position: i64 = 0;
    for deck in decks {
        let did = stable_id("deck", &deck.name);
        let mid = stable_id("model", &deck.name);
        for card in &deck.cards {
            position += 1;
            let key = format!("{}\0{}\0{}\0{}", deck.name, position, card.question, card.answer);
            let nid = claim_id(&mut used_ids, stable_wide_id("note", &key));
            let cid = claim_id(&mut used_ids, stable_wide_id("card", &key));
            let fields = format!("{}{FIELD_SEPARATOR}{}", card.question, card.answer);

            tx.execute(
                "INSERT INTO notes (id, guid, mid, mod, usn, tags, flds, sfld, csum, flags, data)
                 VALUES (?1, ?2, ?3, ?4, -1, '', ?5, ?6, ?7, 0, '')",
                params![
                    nid,
                    note_guid(&key),
                    mid,
                    now_secs,
                    fields,
                    card.question,
                    field_checksum(&card.question),
                ],
            )
            .map_err(|e| package_failed("Failed to write note", e))?;

            tx.execute(
                "INSERT INTO cards (id, nid, did, ord, mod, usn, type, queue, due, ivl, factor,
                                    reps, lapses, left, odue, odid, flags, data)
                 VALUES (?1, ?2, ?3, 0, ?4, -1, 0, 0, ?5, 0, 0, 0, 0, 0, 0, 0, 0, '')",
                params![cid, nid, did, now_secs, position],
            )
            .map_err(|e| package_failed("Failed to write card", e))?;
        }
    }

    tx.commit()
        .map_err(|e| package_failed("Failed to commit collection", e))?;
    Ok(position as usize)
}

fn claim_id(used: &mut HashSet<i64>, mut id: i64) -> i64 {
    while !used.insert(id) {
        id += 1;
    }
    id
}

fn write_zip(out_path: &Path, collection: &[u8]) -> Result<(), AppError> {
    let file = File::create(out_path).map_err(|e| package_failed("Failed to create package file", e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("collection.anki2", options)
        .map_err(|e| package_failed("Failed to add collection to package", e))?;
    zip.write_all(collection)
        .map_err(|e| package_failed("Failed to add collection to package", e))?;
    zip.start_file("media", options)
        .map_err(|e| package_failed("Failed to add media manifest to package", e))?;
    zip.write_all(b"{}")
        .map_err(|e| package_failed("Failed to add media manifest to package", e))?;
    zip.finish()
        .map_err(|e| package_failed("Failed to finalize package", e))?;
    Ok(())
}

fn package_failed(message: &str, err: impl std::fmt::Display) -> AppError {
    AppError::new("PACKAGE_FAILED", message).with_details(err.to_string())
}

fn deck_json(id: i64, name: &str, mod_secs: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": "",
        "mod": mod_secs,
        "usn": -1,
        "collapsed": false,
        "newToday": [0, 0],
        "revToday": [0, 0],
        "lrnToday": [0, 0],
        "timeToday": [0, 0],
        "dyn": 0,
        "conf": 1,
        "extendNew": 10,
        "extendRev": 50,
    })
}

fn model_json(id: i64, deck_id: i64, deck_name: &str, mod_secs: i64) -> Value {
    let field = |name: &str, ord: u32| {
        json!({
            "name": name,
            "ord": ord,
            "sticky": false,
            "rtl": false,
            "font": "Arial",
            "size": 20,
            "media": [],
        })
    };
    json!({
        "id": id,
        "name": format!("Flashcard ({deck_name})"),
        "type": 0,
        "mod": mod_secs,
        "usn": -1,
        "sortf": 0,
        "did": deck_id,
        "tmpls": [{
            "name": "Card 1",
            "ord": 0,
            "qfmt": "{{Question}}",
            "afmt": "{{FrontSide}}<hr id=\"answer\">{{Answer}}",
            "bqfmt": "",
            "bafmt": "",
            "did": null,
        }],
        "flds": [field("Question", 0), field("Answer", 1)],
        "css": CARD_CSS,
        "latexPre": "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n",
        "latexPost": "\\end{document}",
        "tags": [],
        "vers": [],
        "req": [[0, "any", [0]]],
    })
}

fn collection_conf_json() -> Value {
    json!({
        "activeDecks": [1],
        "curDeck": 1,
        "newSpread": 0,
        "collapseTime": 1200,
        "timeLim": 0,
        "estTimes": true,
        "dueCounts": true,
        "curModel": null,
        "nextPos": 1,
        "sortType": "noteFld",
        "sortBackwards": false,
        "addToCur": true,
    })
}

fn deck_conf_json() -> Value {
    json!({
        "1": {
            "id": 1,
            "name": "Default",
            "mod": 0,
            "usn": 0,
            "maxTaken": 60,
            "autoplay": true,
            "timer": 0,
            "replayq": true,
            "dyn": false,
            "new": {
                "perDay": 20,
                "delays": [1, 10],
                "ints": [1, 4, 7],
                "initialFactor": 2500,
                "separate": true,
                "order": 1,
                "bury": true,
            },
            "rev": {
                "perDay": 100,
                "ease4": 1.3,
                "fuzz": 0.05,
                "ivlFct": 1,
                "maxIvl": 36500,
                "minSpace": 1,
                "bury": true,
            },
            "lapse": {
                "delays": [10],
                "mult": 0,
                "minInt": 1,
                "leechFails": 8,
                "leechAction": 0,
            },
        }
    })
}
