//! What gets inserted into module text, and what is left alone.

use autoss_config::AutossConfig;
use autoss_conformance::{generate, generate_with, module_text};
use autoss_core::{StateError, BANNER_RULE};

#[test]
fn stateless_module_is_emitted_verbatim() {
    let glue = "module glue (input a, output y);\n  assign y = ~a;\nendmodule";
    let out = generate(&[("glue.v", &format!("{glue}\n"))], "glue").unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].text, format!("{BANNER_RULE}\n// MODULE glue\n{glue}\n\n\n"));
}

#[test]
fn module_with_only_combinational_logic_has_no_ports_added() {
    let source = "module mux (input s, input a, input b, output reg y);\n\
                  always @(*) y = s ? a : b;\n\
                  endmodule\n";
    let out = generate(&[("mux.v", source)], "mux").unwrap();
    assert!(!out[0].text.contains("auto_ss"), "{}", out[0].text);
}

#[test]
fn predefined_interface_is_not_touched() {
    let ram = "module ram (input clk, input [31:0] auto_ss_in, input auto_ss_wr, output [31:0] auto_ss_out);\n\
               reg [31:0] mem;\n\
               always @(posedge clk) if (auto_ss_wr) mem <= auto_ss_in;\n\
               assign auto_ss_out = mem;\n\
               endmodule";
    let top = "module top (input clk);\n\
               reg [1:0] mode;\n\
               always @(posedge clk) mode <= mode + 1;\n\
               ram r0 (.clk(clk));\n\
               endmodule\n";
    let out = generate(&[("ram.v", &format!("{ram}\n")), ("top.v", top)], "top").unwrap();
    assert_eq!(module_text(&out, "ram").unwrap(), format!("{BANNER_RULE}\n// MODULE ram\n{ram}\n\n\n"));
    let top = module_text(&out, "top").unwrap();
    assert!(top.contains("output [33:0] auto_ss_out"), "{top}");
    assert!(top.contains(".auto_ss_in(auto_ss_in[2 +: 32])"), "{top}");
}

#[test]
fn scalar_registers_need_no_generate_block() {
    let source = "module m (input clk, input [3:0] d);\n\
                  reg [3:0] a;\n\
                  reg b;\n\
                  always @(posedge clk) begin a <= d; b <= d[0]; end\n\
                  endmodule\n";
    let out = generate(&[("m.v", source)], "m").unwrap();
    let text = &out[0].text;
    assert!(!text.contains("generate"), "{text}");
    assert!(!text.contains("integer"), "{text}");
    assert!(text.contains("a <= auto_ss_in[0 +: 4];\nb <= auto_ss_in[4];"), "{text}");
    assert!(text.contains("assign auto_ss_out[0 +: 4] = a;\nassign auto_ss_out[4] = b;"), "{text}");
}

#[test]
fn array_registers_are_copied_in_loops() {
    let source = "module fifo (input clk, input [7:0] din);\n\
                  reg [7:0] data [0:15];\n\
                  reg [3:0] wp;\n\
                  always @(posedge clk) begin data[wp] <= din; wp <= wp + 1; end\n\
                  endmodule\n";
    let out = generate(&[("fifo.v", source)], "fifo").unwrap();
    let text = &out[0].text;
    assert!(text.contains("genvar auto_ss_idx;"), "{text}");
    assert!(text.contains("if (auto_ss_wr) begin : blk_wr_data\ninteger auto_ss_idx;"), "{text}");
    assert!(
        text.contains("for (auto_ss_idx = 0; auto_ss_idx < (16); auto_ss_idx=auto_ss_idx+1) begin\n\
                       data[auto_ss_idx] <= auto_ss_in[8*auto_ss_idx +: 8];\nend"),
        "{text}"
    );
    assert!(text.contains("generate\n"), "{text}");
    assert!(text.contains(": blk_asg_data\n"), "{text}");
    assert!(text.contains("assign auto_ss_out[128 +: 4] = wp;"), "{text}");
    assert!(text.contains("endgenerate"), "{text}");
}

#[test]
fn active_low_reset_gets_an_else_branch() {
    let source = "module c (input clk, input rst_n);\n\
                  reg [1:0] s;\n\
                  always @(posedge clk or negedge rst_n) begin\n\
                  if (!rst_n) s <= 0;\n\
                  else s <= s + 1;\n\
                  end\n\
                  endmodule\n";
    let out = generate(&[("c.v", source)], "c").unwrap();
    assert!(
        out[0]
            .text
            .contains("if (!rst_n) s <= 0;\nelse if (auto_ss_wr) begin\ns <= auto_ss_in[0 +: 2];\nend"),
        "{}",
        out[0].text
    );
}

#[test]
fn reset_assumption_violation_names_the_module() {
    let source = "module bad (input clk, input rst, input en);\n\
                  reg q;\n\
                  always @(posedge clk or posedge rst)\n\
                  if (en) q <= 1;\n\
                  else if (rst) q <= 0;\n\
                  endmodule\n";
    let err = generate(&[("bad.v", source)], "bad").unwrap_err();
    assert!(matches!(
        &err,
        StateError::ResetAssumptionViolated { module, signal, .. } if module == "bad" && signal == "rst"
    ));
    assert!(err.to_string().contains("bad"), "{err}");
}

#[test]
fn port_redeclared_with_other_width_conflicts() {
    let source = "module m (clk, q);\n\
                  input clk;\n\
                  output [7:0] q;\n\
                  reg [3:0] q;\n\
                  always @(posedge clk) q <= 0;\n\
                  endmodule\n";
    let err = generate(&[("m.v", source)], "m").unwrap_err();
    match err {
        StateError::ConflictingDeclaration {
            module, register, ..
        } => {
            assert_eq!(module, "m");
            assert_eq!(register, "q");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn non_ansi_module_gets_port_declarations() {
    let source = "module m (clk, q);\n\
                  input clk;\n\
                  output [7:0] q;\n\
                  reg [7:0] q;\n\
                  always @(posedge clk) q <= q + 1;\n\
                  endmodule\n";
    let out = generate(&[("m.v", source)], "m").unwrap();
    let text = &out[0].text;
    assert!(text.contains("auto_ss_in, auto_ss_wr, auto_ss_out"), "{text}");
    assert!(
        text.contains("input [7:0] auto_ss_in;\ninput auto_ss_wr;\noutput [7:0] auto_ss_out;"),
        "{text}"
    );
}

#[test]
fn mixed_parameter_styles_are_rejected() {
    let source = "module leaf #(parameter W = 1, parameter D = 1) (input clk);\n\
                  reg [W-1:0] r;\n\
                  always @(posedge clk) r <= 0;\n\
                  endmodule\n\
                  module top (input clk);\n\
                  leaf #(4, .D(2)) l (.clk(clk));\n\
                  endmodule\n";
    let err = generate(&[("top.v", source)], "top").unwrap_err();
    assert!(matches!(err, StateError::MixedParameterStyles { .. }), "{err}");
}

#[test]
fn custom_prefix_is_used_everywhere() {
    let config = AutossConfig {
        prefix: "snap".to_string(),
        ..AutossConfig::default()
    };
    let leaf = "module leaf (input clk);\nreg [2:0] r [0:1];\nalways @(posedge clk) r[0] <= 0;\nendmodule\n";
    let top = "module top (input clk);\nleaf l (.clk(clk));\nendmodule\n";
    let out = generate_with(&[("leaf.v", leaf), ("top.v", top)], "top", &config).unwrap();
    let text: String = out.iter().map(|m| m.text.as_str()).collect();
    assert!(!text.contains("auto_ss"), "{text}");
    assert!(text.contains("genvar snap_idx;"), "{text}");
    assert!(text.contains(".snap_wr(snap_wr)"), "{text}");
}

#[test]
fn custom_reset_aliases_are_honored() {
    let config = AutossConfig {
        reset_signals: vec!["clear".to_string()],
        ..AutossConfig::default()
    };
    let source = "module m (input clk, input clear);\n\
                  reg q;\n\
                  always @(posedge clk or posedge clear)\n\
                  if (clear) q <= 0; else q <= ~q;\n\
                  endmodule\n";
    let out = generate_with(&[("m.v", source)], "m", &config).unwrap();
    assert!(out[0].text.contains("else if (auto_ss_wr) begin"), "{}", out[0].text);
}
