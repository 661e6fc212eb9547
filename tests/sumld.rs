//  Copyright (C) 2014-2023 Ryan Specialty Group, LLC.
//
//  This file is part of modsum.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use modsum::guid::Guid;
use modsum::indexer::index_module;
use modsum::ir;
use modsum::obj::modsum::{read_summary_index, write_summary_index};

/// Index `module` and write its summary file under `dir`.
fn write_module(dir: &Path, file: &str, module: &ir::Module) -> PathBuf {
    let index = index_module(module).expect("indexing failed");
    let path = dir.join(file);

    fs::write(&path, write_summary_index(&index)).expect("write failed");
    path
}

fn function(name: &str, body: Vec<ir::Inst>) -> ir::Function {
    ir::Function {
        name: name.into(),
        body,
        ..Default::default()
    }
}

fn direct(callee: &str) -> ir::Inst {
    ir::Inst::FunctionRef {
        callee: callee.into(),
    }
}

#[test]
fn link_invalid_argument() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("sumld")?;
    cmd.arg("-q");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("Unrecognized option:"));

    Ok(())
}

#[test]
fn link_missing_input_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("sumld")?;
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("FILE"));

    Ok(())
}

#[test]
fn link_missing_output_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("sumld")?;
    cmd.arg("foobar");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("-o OUTPUT"));

    Ok(())
}

#[test]
fn link_input_file_does_not_exist(
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    let mut cmd = Command::cargo_bin("sumld")?;
    cmd.arg("foobar");
    cmd.arg("-o").arg(dir.path().join("out.modsum"));
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No such file or directory"));

    Ok(())
}

#[test]
fn link_invalid_input_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let bad = dir.path().join("bad.modsum");
    fs::write(&bad, b"this is not a module summary")?;

    let mut cmd = Command::cargo_bin("sumld")?;
    cmd.arg(&bad);
    cmd.arg("-o").arg(dir.path().join("out.modsum"));
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid module summary"));

    Ok(())
}

#[test]
fn link_duplicate_symbol_across_modules(
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    let module_a = ir::Module {
        name: "A".into(),
        functions: vec![function("f", vec![])],
        ..Default::default()
    };
    let module_b = ir::Module {
        name: "B".into(),
        functions: vec![function("f", vec![])],
        ..Default::default()
    };

    let a = write_module(dir.path(), "a.modsum", &module_a);
    let b = write_module(dir.path(), "b.modsum", &module_b);

    let mut cmd = Command::cargo_bin("sumld")?;
    cmd.arg(&a).arg(&b);
    cmd.arg("-o").arg(dir.path().join("out.modsum"));
    cmd.assert()
        .failure()
        .code(exitcode::SOFTWARE)
        .stderr(predicate::str::contains("duplicate symbol"));

    Ok(())
}

// Two modules: `main` reaches `f` across the module boundary and
//   `B.impl` through witness dispatch,
//     while `orphan` remains unreferenced.
#[test]
fn link_marks_reachable_functions(
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    let module_a = ir::Module {
        name: "A".into(),
        functions: vec![
            function("main", vec![direct("f")]),
            function("orphan", vec![direct("f")]),
        ],
        ..Default::default()
    };

    let module_b = ir::Module {
        name: "B".into(),
        functions: vec![
            function(
                "f",
                vec![ir::Inst::WitnessMethod {
                    requirement: "P.m".into(),
                }],
            ),
            function("B.impl", vec![]),
        ],
        witness_tables: vec![ir::WitnessTable {
            module: "B".into(),
            protocol_module: "B".into(),
            entries: vec![ir::WitnessEntry {
                requirement: "P.m".into(),
                witness: Some("B.impl".into()),
            }],
        }],
        ..Default::default()
    };

    let a = write_module(dir.path(), "a.modsum", &module_a);
    let b = write_module(dir.path(), "b.modsum", &module_b);
    let out = dir.path().join("out.modsum");

    let mut cmd = Command::cargo_bin("sumld")?;
    cmd.arg(&a).arg(&b);
    cmd.arg("-o").arg(&out);
    cmd.assert().success();

    let combined = read_summary_index(&fs::read(&out)?)?;

    assert_eq!("combined", combined.name());

    for live in ["main", "f", "B.impl"] {
        assert!(
            combined
                .function(Guid::from_unique_name(live))
                .expect(live)
                .is_live(),
            "{live} should be live",
        );
    }

    assert!(!combined
        .function(Guid::from_unique_name("orphan"))
        .expect("orphan")
        .is_live());

    Ok(())
}

#[test]
fn link_prints_live_trace() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    let module_a = ir::Module {
        name: "A".into(),
        functions: vec![
            function("main", vec![direct("f1")]),
            function("f1", vec![direct("f2")]),
        ],
        ..Default::default()
    };

    let module_b = ir::Module {
        name: "B".into(),
        functions: vec![
            function("f2", vec![direct("f3")]),
            function("f3", vec![]),
        ],
        ..Default::default()
    };

    let a = write_module(dir.path(), "a.modsum", &module_a);
    let b = write_module(dir.path(), "b.modsum", &module_b);

    let expected = format!(
        "f3 ({}) is referenced by:\n \
         - f2 ({})\n \
         - f1 ({})\n \
         - main ({})\n",
        Guid::from_unique_name("f3"),
        Guid::from_unique_name("f2"),
        Guid::from_unique_name("f1"),
        Guid::from_unique_name("main"),
    );

    let mut cmd = Command::cargo_bin("sumld")?;
    cmd.arg(&a).arg(&b);
    cmd.arg("-o").arg(dir.path().join("out.modsum"));
    cmd.arg("--lto-print-live-trace").arg("f3");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(expected));

    Ok(())
}

// The annotated output must itself be a valid summary,
//   so a second link over it should succeed.
#[test]
fn link_output_relinks() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    let module = ir::Module {
        name: "A".into(),
        functions: vec![function("main", vec![])],
        ..Default::default()
    };

    let a = write_module(dir.path(), "a.modsum", &module);
    let out = dir.path().join("out.modsum");
    let out2 = dir.path().join("out2.modsum");

    Command::cargo_bin("sumld")?
        .arg(&a)
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    Command::cargo_bin("sumld")?
        .arg(&out)
        .arg("-o")
        .arg(&out2)
        .assert()
        .success();

    let relinked = read_summary_index(&fs::read(&out2)?)?;

    assert!(relinked
        .function(Guid::from_unique_name("main"))
        .expect("main")
        .is_live());

    Ok(())
}
