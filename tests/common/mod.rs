//! Common test helpers and fixtures shared across the test suite.

use std::path::PathBuf;

use marcmap::{CompiledRuleSet, CompilerConfig, Datafield, InMemorySource, RawRecord, RuleCompiler};

/// Directory holding the fixture rule file, translations and MARCXML.
pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data")
}

/// Compiler configured with the fixture translation directory.
#[allow(dead_code)]
pub fn fixture_config() -> CompilerConfig {
    CompilerConfig::default().with_translation_dir(data_dir().join("translations"))
}

/// Compile the fixture rule file.
#[allow(dead_code)]
pub fn catalog_rules() -> CompiledRuleSet {
    RuleCompiler::from_config(&fixture_config())
        .compile_file(data_dir().join("catalog.rules"))
        .expect("fixture rules compile")
}

/// Compile rule text against a small set of in-memory tables.
#[allow(dead_code)]
pub fn compile(text: &str) -> CompiledRuleSet {
    let tables = InMemorySource::new()
        .with_table("notes.properties", "bibliography=Has bibliography\n")
        .with_table("roles.properties", "aut=Author\nedt=Editor\n");
    RuleCompiler::new(tables)
        .compile(text)
        .expect("test rules compile")
}

/// A record with one 100 author field.
#[allow(dead_code)]
pub fn create_author_record() -> RawRecord {
    RawRecord::builder("author-1")
        .data_field(
            Datafield::builder("100", '1', ' ')
                .subfield_str('a', "Smith, J.")
                .subfield_str('d', "1900-1980")
                .build(),
        )
        .build()
}

/// A realistic record with control fields, titles, subjects and names.
#[allow(dead_code)]
pub fn create_realistic_record() -> RawRecord {
    RawRecord::builder("gatsby")
        .leader("00000nam a2200000 a 4500")
        .control_field_str("001", "gatsby")
        .control_field_str("008", "850101s1925    nyu           000 1 eng d")
        .data_field(
            Datafield::builder("100", '1', ' ')
                .subfield_str('a', "Fitzgerald, F. Scott")
                .subfield_str('4', "aut")
                .build(),
        )
        .data_field(
            Datafield::builder("245", '1', '4')
                .subfield_str('a', "The great Gatsby /")
                .subfield_str('c', "F. Scott Fitzgerald")
                .build(),
        )
        .data_field(
            Datafield::builder("500", ' ', ' ')
                .subfield_str('a', "First edition.")
                .build(),
        )
        .data_field(
            Datafield::builder("650", ' ', '0')
                .subfield_str('a', "Rich people")
                .subfield_str('z', "New York (State)")
                .build(),
        )
        .data_field(
            Datafield::builder("650", ' ', '0')
                .subfield_str('a', "Married women")
                .build(),
        )
        .data_field(
            Datafield::builder("650", ' ', '0')
                .subfield_str('a', "Rich people")
                .build(),
        )
        .data_field(
            Datafield::builder("700", '1', ' ')
                .subfield_str('a', "Perkins, Maxwell")
                .subfield_str('4', "edt")
                .build(),
        )
        .build()
}
