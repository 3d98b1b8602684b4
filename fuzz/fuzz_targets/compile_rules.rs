#![no_main]

use libfuzzer_sys::fuzz_target;
use marcmap::{transform, Datafield, InMemorySource, RawRecord, RuleCompiler};

// Compiling arbitrary rule text must return Ok or Err, never panic. Rule sets
// that compile are run against a small record and re-compiled from their
// Display form.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let tables = InMemorySource::new().with_table("t.properties", "a=b\n^x.*=y\n");
    let compiler = RuleCompiler::new(tables);
    let Ok(rules) = compiler.compile(text) else {
        return;
    };

    let record = RawRecord::builder("fuzz")
        .leader("00000nam a2200000 a 4500")
        .control_field_str("008", "850101s1925    nyu           000 1 eng d")
        .data_field(
            Datafield::builder("245", '1', '0')
                .subfield_str('a', "Title")
                .subfield_str('b', "x")
                .build(),
        )
        .build();
    let _ = transform(&record, &rules);
    let _ = compiler.compile(&rules.to_string());
});
