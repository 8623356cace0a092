// Copyright 2026 the LMNT Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![doc = "Code generator for `lmnt` opcode tables.\n\n\
          This is a std-only build tool crate. It is not shipped as part of the VM.\n"]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

#[derive(Deserialize, Clone)]
struct Spec {
    version: u32,
    opcodes: Vec<OpcodeSpec>,
}

#[derive(Deserialize, Clone)]
struct OpcodeSpec {
    name: String,
    mnemonic: String,
    value: String,
    branch: bool,
    doc: Option<String>,
    operands: Vec<OperandSpec>,
}

#[derive(Deserialize, Clone)]
struct OperandSpec {
    kind: String,
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    width: Option<String>,
}

fn parse_u16_hex(s: &str) -> Result<u16> {
    let s = s.trim();
    let raw = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(raw, 16).with_context(|| format!("invalid opcode value '{s}'"))
}

fn fmt_hex(v: u16) -> String {
    format!("0x{v:02X}")
}

fn sort_and_validate_ops(ops: &mut [(u16, OpcodeSpec)]) -> Result<()> {
    ops.sort_by(|(v0, o0), (v1, o1)| v0.cmp(v1).then_with(|| o0.name.cmp(&o1.name)));

    // The dispatch tables are indexed by opcode value, so values must be dense from zero.
    for (expected, (v, op)) in ops.iter().enumerate() {
        if usize::from(*v) != expected {
            bail!(
                "opcode {} has value {} but {} was expected (values must be dense)",
                op.name,
                fmt_hex(*v),
                expected
            );
        }
    }
    for w in ops.windows(2) {
        if w[0].1.name == w[1].1.name {
            bail!("duplicate opcode name '{}'", w[0].1.name);
        }
    }
    Ok(())
}

fn operand_kind_rust(kind: &str) -> Result<&'static str> {
    Ok(match kind {
        "unused" => "OperandKind::Unused",
        "stack" => "OperandKind::Stack",
        "imm" => "OperandKind::Imm",
        "section" => "OperandKind::Section",
        "code_lo" => "OperandKind::CodeLo",
        "code_hi" => "OperandKind::CodeHi",
        "def_lo" => "OperandKind::DefLo",
        "def_hi" => "OperandKind::DefHi",
        other => bail!("unknown operand kind '{other}'"),
    })
}

fn operand_access_rust(access: &str) -> Result<&'static str> {
    Ok(match access {
        "read" => "Some(OperandAccess::Read)",
        "write" => "Some(OperandAccess::Write)",
        "read_write" => "Some(OperandAccess::ReadWrite)",
        other => bail!("unknown operand access '{other}'"),
    })
}

fn operand_width_rust(width: &str) -> Result<&'static str> {
    Ok(match width {
        "scalar" => "OperandWidth::Scalar",
        "vector" => "OperandWidth::Vector",
        "dynamic" => "OperandWidth::Dynamic",
        other => bail!("unknown operand width '{other}'"),
    })
}

fn operand_rust(op: &OpcodeSpec, operand: &OperandSpec) -> Result<String> {
    let kind = operand_kind_rust(&operand.kind)?;
    let (access, width) = if operand.kind == "stack" {
        let access = operand
            .access
            .as_deref()
            .with_context(|| format!("missing stack operand access for opcode {}", op.name))?;
        let width = operand
            .width
            .as_deref()
            .with_context(|| format!("missing stack operand width for opcode {}", op.name))?;
        (operand_access_rust(access)?, operand_width_rust(width)?)
    } else {
        if operand.access.is_some() || operand.width.is_some() {
            bail!(
                "unexpected access/width on {} operand of opcode {}",
                operand.kind,
                op.name
            );
        }
        ("None", "OperandWidth::None")
    };
    Ok(format!("OperandSchema::new({kind}, {access}, {width})"))
}

fn generate(spec: Spec, src: &Path) -> Result<String> {
    if spec.version != 1 {
        bail!("unsupported opcodes.json version {}", spec.version);
    }

    let mut ops: Vec<(u16, OpcodeSpec)> = Vec::with_capacity(spec.opcodes.len());
    for op in spec.opcodes {
        let v = parse_u16_hex(&op.value)?;
        ops.push((v, op));
    }
    sort_and_validate_ops(&mut ops)?;

    let mut out = String::new();
    out.push_str("// Copyright 2026 the LMNT Authors\n");
    out.push_str("// SPDX-License-Identifier: Apache-2.0 OR MIT\n\n");
    out.push_str("// @generated by lmnt_codegen. Do not edit by hand.\n");
    let _ = src;
    out.push('\n');

    out.push_str("/// Operand kinds used by the opcode table.\n");
    out.push_str("#[derive(Copy, Clone, Debug, PartialEq, Eq)]\n");
    out.push_str("pub enum OperandKind {\n");
    out.push_str("    /// The operand is ignored.\n");
    out.push_str("    Unused,\n");
    out.push_str("    /// A value stack slot.\n");
    out.push_str("    Stack,\n");
    out.push_str("    /// A 16-bit immediate, or one half of a 32-bit immediate.\n");
    out.push_str("    Imm,\n");
    out.push_str("    /// A data section index.\n");
    out.push_str("    Section,\n");
    out.push_str("    /// Low half of a branch target.\n");
    out.push_str("    CodeLo,\n");
    out.push_str("    /// High half of a branch target.\n");
    out.push_str("    CodeHi,\n");
    out.push_str("    /// Low half of a def offset.\n");
    out.push_str("    DefLo,\n");
    out.push_str("    /// High half of a def offset.\n");
    out.push_str("    DefHi,\n");
    out.push_str("}\n\n");

    out.push_str("/// Access for stack operands.\n");
    out.push_str("#[allow(missing_docs, reason = \"generated\")]\n");
    out.push_str("#[derive(Copy, Clone, Debug, PartialEq, Eq)]\n");
    out.push_str("pub enum OperandAccess {\n");
    out.push_str("    Read,\n");
    out.push_str("    Write,\n");
    out.push_str("    ReadWrite,\n");
    out.push_str("}\n\n");

    out.push_str("/// Number of consecutive stack slots covered by an operand.\n");
    out.push_str("#[derive(Copy, Clone, Debug, PartialEq, Eq)]\n");
    out.push_str("pub enum OperandWidth {\n");
    out.push_str("    /// Not a stack operand.\n");
    out.push_str("    None,\n");
    out.push_str("    /// One slot.\n");
    out.push_str("    Scalar,\n");
    out.push_str("    /// Four slots.\n");
    out.push_str("    Vector,\n");
    out.push_str("    /// Decided by the instruction itself.\n");
    out.push_str("    Dynamic,\n");
    out.push_str("}\n\n");

    out.push_str("impl OperandWidth {\n");
    out.push_str("    /// Returns the static slot count, if there is one.\n");
    out.push_str("    #[must_use]\n");
    out.push_str("    pub const fn slots(self) -> Option<u32> {\n");
    out.push_str("        match self {\n");
    out.push_str("            Self::Scalar => Some(1),\n");
    out.push_str("            Self::Vector => Some(4),\n");
    out.push_str("            Self::None | Self::Dynamic => None,\n");
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");

    out.push_str("/// Operand schema metadata.\n");
    out.push_str("#[derive(Copy, Clone, Debug, PartialEq, Eq)]\n");
    out.push_str("pub struct OperandSchema {\n");
    out.push_str("    /// Operand kind.\n");
    out.push_str("    pub kind: OperandKind,\n");
    out.push_str("    /// Operand access, if this is a stack operand.\n");
    out.push_str("    pub access: Option<OperandAccess>,\n");
    out.push_str("    /// Operand width, if this is a stack operand.\n");
    out.push_str("    pub width: OperandWidth,\n");
    out.push_str("}\n\n");

    out.push_str("impl OperandSchema {\n");
    out.push_str("    const fn new(kind: OperandKind, access: Option<OperandAccess>, width: OperandWidth) -> Self {\n");
    out.push_str("        Self { kind, access, width }\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");

    out.push_str("/// Per-opcode metadata used by validation and disassembly.\n");
    out.push_str("#[derive(Copy, Clone, Debug, PartialEq, Eq)]\n");
    out.push_str("pub struct OpcodeInfo {\n");
    out.push_str("    /// Stable, parseable opcode name.\n");
    out.push_str("    pub mnemonic: &'static str,\n");
    out.push_str("    /// Whether `arg2`/`arg3` hold a branch target.\n");
    out.push_str("    pub is_branch: bool,\n");
    out.push_str("    /// Operand schemas for `arg1`, `arg2`, `arg3`.\n");
    out.push_str("    pub operands: [OperandSchema; 3],\n");
    out.push_str("}\n\n");

    writeln!(out, "/// Number of defined opcodes.")?;
    writeln!(out, "pub const OPCODE_COUNT: usize = {};\n", ops.len())?;

    out.push_str("/// Metadata indexed by opcode value.\n");
    out.push_str("#[rustfmt::skip]\n");
    out.push_str("pub const OPCODE_INFO: [OpcodeInfo; OPCODE_COUNT] = [\n");
    for (v, op) in &ops {
        if op.operands.len() != 3 {
            bail!(
                "opcode {} declares {} operands (expected 3)",
                op.name,
                op.operands.len()
            );
        }
        let mut schemas = Vec::with_capacity(3);
        for operand in &op.operands {
            schemas.push(operand_rust(op, operand)?);
        }
        writeln!(
            out,
            "    OpcodeInfo {{ mnemonic: \"{}\", is_branch: {}, operands: [{}] }}, // {} {}",
            op.mnemonic,
            op.branch,
            schemas.join(", "),
            fmt_hex(*v),
            op.name
        )?;
    }
    out.push_str("];\n\n");

    out.push_str("/// LMNT opcode.\n");
    out.push_str("#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]\n");
    out.push_str("#[repr(u16)]\n");
    out.push_str("pub enum Opcode {\n");
    for (v, op) in &ops {
        let doc = op
            .doc
            .as_deref()
            .with_context(|| format!("missing doc for opcode {}", op.name))?;
        for line in doc.lines() {
            writeln!(out, "    /// {line}")?;
        }
        writeln!(out, "    {} = {},", op.name, fmt_hex(*v))?;
    }
    out.push_str("}\n\n");

    out.push_str("impl Opcode {\n");
    out.push_str("    /// Decodes an opcode value.\n");
    out.push_str("    #[must_use]\n");
    out.push_str("    pub fn from_u16(v: u16) -> Option<Self> {\n");
    out.push_str("        Some(match v {\n");
    for (v, op) in &ops {
        writeln!(out, "            {} => Self::{},", fmt_hex(*v), op.name)?;
    }
    out.push_str("            _ => return None,\n");
    out.push_str("        })\n");
    out.push_str("    }\n");

    out.push_str("\n    /// Returns opcode metadata for this opcode.\n");
    out.push_str("    #[must_use]\n");
    out.push_str("    pub fn info(self) -> &'static OpcodeInfo {\n");
    out.push_str("        &OPCODE_INFO[usize::from(self as u16)]\n");
    out.push_str("    }\n");

    out.push_str("\n    /// Stable, parseable opcode name.\n");
    out.push_str("    ///\n");
    out.push_str("    /// This string is used by the disassembler output.\n");
    out.push_str("    #[must_use]\n");
    out.push_str("    pub fn mnemonic(self) -> &'static str {\n");
    out.push_str("        self.info().mnemonic\n");
    out.push_str("    }\n");

    out.push_str("\n    /// Returns `true` if this opcode carries a branch target in `arg2`/`arg3`.\n");
    out.push_str("    #[must_use]\n");
    out.push_str("    pub fn is_branch(self) -> bool {\n");
    out.push_str("        self.info().is_branch\n");
    out.push_str("    }\n");

    out.push_str("\n    /// Returns operand schemas for `arg1`, `arg2`, `arg3`.\n");
    out.push_str("    #[must_use]\n");
    out.push_str("    pub fn operands(self) -> &'static [OperandSchema; 3] {\n");
    out.push_str("        &self.info().operands\n");
    out.push_str("    }\n");
    out.push_str("}\n");

    Ok(out)
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let spec_path: PathBuf = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("lmnt/opcodes.json"));
    let opcode_out_path: PathBuf = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("lmnt/src/opcodes_gen.rs"));
    if args.next().is_some() {
        bail!("usage: lmnt_codegen [spec.json] [opcodes_out.rs]");
    }

    let json =
        fs::read_to_string(&spec_path).with_context(|| format!("read {}", spec_path.display()))?;
    let spec: Spec =
        serde_json::from_str(&json).with_context(|| format!("parse {}", spec_path.display()))?;

    let rendered = generate(spec, &spec_path)?;

    if let Some(parent) = opcode_out_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(&opcode_out_path, rendered.as_bytes())
        .with_context(|| format!("write {}", opcode_out_path.display()))?;
    Ok(())
}
