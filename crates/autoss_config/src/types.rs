//! Configuration types deserialized from `autoss.toml`.

use serde::Deserialize;

/// Default prefix of every injected identifier.
pub const DEFAULT_PREFIX: &str = "auto_ss";

/// Signal names treated as resets when they appear in a clocked block's
/// sensitivity list. Matching is case-insensitive.
pub const DEFAULT_RESET_SIGNALS: &[&str] = &[
    "rst", "nrst", "rstn", "n_rst", "rst_n", "reset", "nreset", "resetn", "n_reset", "reset_n",
];

/// Alignment flags passed to the formatter unless overridden.
pub const DEFAULT_FORMAT_ARGS: &[&str] = &[
    "--port_declarations_alignment=align",
    "--named_port_alignment=align",
    "--assignment_statement_alignment=align",
    "--formal_parameters_alignment=align",
    "--module_net_variable_alignment=align",
    "--named_parameter_alignment=align",
    "--verify_convergence=false",
];

/// The complete tool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutossConfig {
    /// Prefix of the injected ports (`<prefix>_in`, `<prefix>_wr`,
    /// `<prefix>_out`) and the loop variable (`<prefix>_idx`).
    pub prefix: String,
    /// Names recognized as reset signals.
    pub reset_signals: Vec<String>,
    /// External tool commands.
    pub tools: ToolsConfig,
}

impl Default for AutossConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            reset_signals: DEFAULT_RESET_SIGNALS.iter().map(|s| s.to_string()).collect(),
            tools: ToolsConfig::default(),
        }
    }
}

impl AutossConfig {
    /// Name of the state-input port.
    pub fn in_port(&self) -> String {
        format!("{}_in", self.prefix)
    }

    /// Name of the write-strobe port.
    pub fn wr_port(&self) -> String {
        format!("{}_wr", self.prefix)
    }

    /// Name of the state-output port.
    pub fn out_port(&self) -> String {
        format!("{}_out", self.prefix)
    }

    /// Name of the generated loop variable.
    pub fn idx_var(&self) -> String {
        format!("{}_idx", self.prefix)
    }

    /// Returns `true` if `name` matches one of the reset aliases.
    pub fn is_reset_signal(&self, name: &str) -> bool {
        self.reset_signals
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

/// Commands used to invoke the Verible tools.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// Concrete-syntax-tree exporter.
    pub syntax: String,
    /// Macro preprocessor.
    pub preprocessor: String,
    /// Pretty-printer applied to the final output.
    pub formatter: String,
    /// Arguments passed to the formatter.
    pub format_args: Vec<String>,
    /// Macro definitions passed to the preprocessor as `+define+<d>`.
    pub defines: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            syntax: "verible-verilog-syntax".to_string(),
            preprocessor: "verible-verilog-preprocessor".to_string(),
            formatter: "verible-verilog-format".to_string(),
            format_args: DEFAULT_FORMAT_ARGS.iter().map(|s| s.to_string()).collect(),
            defines: vec!["USE_AUTO_SS=1".to_string()],
        }
    }
}
