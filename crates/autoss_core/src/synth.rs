//! Text of the injected save/restore logic, ports and connections.

use crate::dimension::Dimension;
use crate::entities::Register;
use crate::expr::{Expr, ExprError};
use autoss_config::AutossConfig;
use std::fmt::Write;

/// Builds Verilog fragments using the configured names.
#[derive(Clone, Debug)]
pub struct Synthesizer {
    input: String,
    write: String,
    output: String,
    index: String,
}

impl Synthesizer {
    /// Creates a synthesizer for the names of `config`.
    pub fn new(config: &AutossConfig) -> Self {
        Self {
            input: config.in_port(),
            write: config.wr_port(),
            output: config.out_port(),
            index: config.idx_var(),
        }
    }

    /// `r[idx]`, or `r[idx + base]` for arrays not starting at 0.
    fn element(&self, register: &Register, base: &Expr) -> Result<String, ExprError> {
        let index = Expr::symbol(&self.index).add(base)?;
        Ok(format!("{}[{}]", register.name, index))
    }

    fn for_header(&self, len: &Expr) -> String {
        let i = &self.index;
        format!("for ({i} = 0; {i} < ({len}); {i}={i}+1) begin")
    }

    /// Restore logic: loads every register from the state input while the
    /// write strobe is high.
    ///
    /// Array copies need a loop variable; Verilog-2001 only allows the
    /// declaration in a named block, so that block is named after the first
    /// array register.
    pub fn write_logic(&self, registers: &[&Register]) -> Result<String, ExprError> {
        let mut out = match registers.iter().find(|r| r.unpacked.is_some()) {
            Some(array) => format!(
                "if ({}) begin : blk_wr_{}\ninteger {};\n",
                self.write, array.name, self.index
            ),
            None => format!("if ({}) begin\n", self.write),
        };
        for register in registers {
            let Some(allocated) = &register.allocated else {
                continue;
            };
            match &register.unpacked {
                Some(unpacked) => {
                    let slot = self.slot(register)?;
                    let _ = writeln!(out, "{}", self.for_header(&unpacked.size()?));
                    let _ = writeln!(
                        out,
                        "{} <= {}{};",
                        self.element(register, &unpacked.begin())?,
                        self.input,
                        slot
                    );
                    out.push_str("end\n");
                }
                None => {
                    let _ = writeln!(
                        out,
                        "{} <= {}{};",
                        register.name,
                        self.input,
                        allocated.to_text()?
                    );
                }
            }
        }
        out.push_str("end");
        Ok(out)
    }

    /// Save logic: drives the state output from every register.
    ///
    /// With `generate` set the result is wrapped in `generate ...
    /// endgenerate`, as needed once the module has array registers.
    pub fn read_logic(&self, registers: &[&Register], generate: bool) -> Result<String, ExprError> {
        let mut out = String::new();
        for register in registers {
            let Some(allocated) = &register.allocated else {
                continue;
            };
            match &register.unpacked {
                Some(unpacked) => {
                    let slot = self.slot(register)?;
                    let _ = writeln!(
                        out,
                        "{} : blk_asg_{}",
                        self.for_header(&unpacked.size()?),
                        register.name
                    );
                    let _ = writeln!(
                        out,
                        "assign {}{} = {};",
                        self.output,
                        slot,
                        self.element(register, &unpacked.begin())?
                    );
                    out.push_str("end\n");
                }
                None => {
                    let _ = writeln!(
                        out,
                        "assign {}{} = {};",
                        self.output,
                        allocated.to_text()?,
                        register.name
                    );
                }
            }
        }
        if generate {
            Ok(format!("generate\n{out}\nendgenerate\n"))
        } else {
            Ok(out)
        }
    }

    /// Part-select of the element at the loop index.
    fn slot(&self, register: &Register) -> Result<String, ExprError> {
        match register.unpacked_dim(&Expr::symbol(&self.index))? {
            Some(dim) => dim.to_text(),
            None => Ok(String::new()),
        }
    }

    /// ANSI port declarations for a state vector of `state`.
    pub fn ansi_ports(&self, state: &Dimension) -> String {
        let range = state.to_decl_text();
        format!(
            "input {range} {}, input {}, output {range} {}",
            self.input, self.write, self.output
        )
    }

    /// Port names for a non-ANSI header.
    pub fn port_names(&self) -> String {
        format!("{}, {}, {}", self.input, self.write, self.output)
    }

    /// Body declarations matching [`port_names`](Self::port_names).
    pub fn port_declarations(&self, state: &Dimension) -> String {
        let range = state.to_decl_text();
        format!(
            "input {range} {};\ninput {};\noutput {range} {};\n",
            self.input, self.write, self.output
        )
    }

    /// Loop variable used by generated `for` loops.
    pub fn genvar(&self) -> String {
        format!("genvar {};", self.index)
    }

    /// Connections of an instance occupying `range` of the parent's state.
    pub fn connections(&self, range: &Dimension) -> Result<String, ExprError> {
        let slice = range.to_text()?;
        Ok(format!(
            ".{i}({i}{slice}),\n.{o}({o}{slice}),\n.{w}({w})",
            i = self.input,
            o = self.output,
            w = self.write
        ))
    }
}
