//! Allocation and ordering across module hierarchies.

use autoss_config::AutossConfig;
use autoss_conformance::{concat, generate, load, module_text};
use autoss_core::{Design, Dimension, ModuleId, StateError, BANNER_RULE};

const COUNTER: &str = "\
module A (input clk, input rst);
  reg [7:0] cnt;
  always @(posedge clk or posedge rst)
    if (rst) cnt <= 0;
    else cnt <= cnt + 1;
endmodule
";

const TWO_COUNTERS: &str = "\
module TOP (input clk, input rst);
  A a0 (.clk(clk), .rst(rst));
  A a1 (.clk(clk), .rst(rst));
endmodule
";

const SOC: &str = "\
module regfile (input clk, input we, input [2:0] wa, input [15:0] wd);
  reg [15:0] regs [0:7];
  always @(posedge clk) if (we) regs[wa] <= wd;
endmodule

module alu (input [15:0] a, input [15:0] b, output [15:0] y);
  assign y = a + b;
endmodule

module core (input clk, input rst_n);
  reg [15:0] pc;
  reg [3:0] flags;
  reg halted;
  wire [15:0] sum;
  regfile rf (.clk(clk), .we(1'b0), .wa(3'd0), .wd(16'd0));
  alu u_alu (.a(pc), .b(16'd2), .y(sum));
  always @(posedge clk or negedge rst_n) begin
    if (!rst_n) begin
      pc <= 0;
      flags <= 0;
      halted <= 0;
    end else begin
      pc <= sum;
      flags <= pc[3:0];
      halted <= &pc;
    end
  end
endmodule

module soc (input clk, input rst_n);
  core c0 (.clk(clk), .rst_n(rst_n));
  core c1 (.clk(clk), .rst_n(rst_n));
  regfile shared (.clk(clk), .we(1'b1), .wa(3'd1), .wd(16'hffff));
endmodule
";

fn allocated(source: &[(&str, &str)], root: &str) -> (Design, ModuleId) {
    let config = AutossConfig::default();
    let mut design = load(source, &config).unwrap().design;
    let id = design.resolve(root).unwrap();
    design.allocate(id, &config).unwrap();
    (design, id)
}

fn constant(dim: &Dimension) -> (i64, i64) {
    let begin = dim.begin().as_const().unwrap();
    let size = dim.size().unwrap().as_const().unwrap();
    (begin, size)
}

/// Asserts that the registers and instances of `id` tile its state vector
/// without gaps or overlaps, recursively.
fn assert_contiguous(design: &Design, id: ModuleId) {
    let module = design.module(id);
    let Some(state) = &module.state_dim else {
        return;
    };
    let mut ranges: Vec<(i64, i64)> = module
        .registers
        .iter()
        .filter_map(|r| r.allocated.as_ref())
        .chain(module.instances.iter().filter_map(|i| i.allocated.as_ref()))
        .map(constant)
        .collect();
    if module.predefined {
        return;
    }
    ranges.sort();
    let mut next = 0;
    for (begin, size) in ranges {
        assert_eq!(begin, next, "gap or overlap in `{}`", module.name);
        next += size;
    }
    assert_eq!(constant(state), (0, next), "state of `{}`", module.name);
    for child in module.instances.iter().filter_map(|i| i.module) {
        assert_contiguous(design, child);
    }
}

#[test]
fn two_counters_partition_the_top_state() {
    let (design, top) = allocated(&[("a.v", COUNTER), ("top.v", TWO_COUNTERS)], "TOP");
    let a = design.lookup("A").unwrap();
    assert_eq!(design.module(a).state_dim, Some(Dimension::range(7, 0)));
    let top = design.module(top);
    assert_eq!(top.state_dim, Some(Dimension::range(15, 0)));
    assert_eq!(top.instances[0].allocated, Some(Dimension::range(7, 0)));
    assert_eq!(top.instances[1].allocated, Some(Dimension::range(15, 8)));
}

#[test]
fn two_counters_output() {
    let out = generate(&[("a.v", COUNTER), ("top.v", TWO_COUNTERS)], "TOP").unwrap();
    let names: Vec<_> = out.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["A", "TOP"]);

    let a = module_text(&out, "A").unwrap();
    assert!(
        a.contains("input [7:0] auto_ss_in, input auto_ss_wr, output [7:0] auto_ss_out"),
        "{a}"
    );
    assert!(a.contains("else if (auto_ss_wr) begin\ncnt <= auto_ss_in[0 +: 8];\nend"), "{a}");
    assert!(a.contains("assign auto_ss_out[0 +: 8] = cnt;"), "{a}");

    let top = module_text(&out, "TOP").unwrap();
    assert!(
        top.contains("input [15:0] auto_ss_in, input auto_ss_wr, output [15:0] auto_ss_out"),
        "{top}"
    );
    assert!(
        top.contains(".auto_ss_in(auto_ss_in[0 +: 8]),\n.auto_ss_out(auto_ss_out[0 +: 8]),\n.auto_ss_wr(auto_ss_wr)"),
        "{top}"
    );
    assert!(top.contains(".auto_ss_in(auto_ss_in[8 +: 8])"), "{top}");
    assert!(!top.contains("always"), "{top}");
    assert!(concat(&out).starts_with(&format!("{BANNER_RULE}\n// MODULE A\n")));
}

#[test]
fn nested_hierarchy_is_contiguous() {
    let (design, soc) = allocated(&[("soc.v", SOC)], "soc");
    assert_contiguous(&design, soc);

    let core = design.lookup("core").unwrap();
    // pc, flags, halted then the register file
    assert_eq!(design.module(core).reg_dim, Some(Dimension::range(20, 0)));
    assert_eq!(design.module(core).state_dim, Some(Dimension::range(148, 0)));
    let alu = design.lookup("alu").unwrap();
    assert_eq!(design.module(alu).state_dim, None);
    assert_eq!(
        design.module(soc).state_dim,
        Some(Dimension::range(2 * 149 + 128 - 1, 0))
    );
}

#[test]
fn post_order_lists_shared_modules_once() {
    let out = generate(&[("soc.v", SOC)], "soc").unwrap();
    let names: Vec<_> = out.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["regfile", "alu", "core", "soc"]);
}

#[test]
fn allocation_is_idempotent() {
    let config = AutossConfig::default();
    let mut design = load(&[("soc.v", SOC)], &config).unwrap().design;
    let soc = design.resolve("soc").unwrap();
    let first = design.allocate(soc, &config).unwrap();
    let second = design.allocate(soc, &config).unwrap();
    assert_eq!(first, second);
    assert_eq!(design.module(soc).state_dim, first);
}

#[test]
fn output_is_deterministic() {
    let first = concat(&generate(&[("soc.v", SOC)], "soc").unwrap());
    let second = concat(&generate(&[("soc.v", SOC)], "soc").unwrap());
    assert_eq!(first, second);
}

#[test]
fn parameterized_widths_propagate_upwards() {
    let source = "\
module shift #(parameter W = 4, parameter N = 2) (input clk, input d);
  reg [W-1:0] taps [0:N-1];
  always @(posedge clk) taps[0] <= d;
endmodule

module top #(parameter LANES = 3) (input clk, input d);
  shift s0 (.clk(clk), .d(d));
  shift #(.W(LANES), .N(4)) s1 (.clk(clk), .d(d));
  shift #(8) s2 (.clk(clk), .d(d));
endmodule
";
    let (design, top) = allocated(&[("top.v", source)], "top");
    let top = design.module(top);
    let sizes: Vec<String> = top
        .instances
        .iter()
        .map(|i| i.allocated.as_ref().unwrap().size().unwrap().to_string())
        .collect();
    assert_eq!(sizes, vec!["8", "4*LANES", "16"]);
    assert_eq!(
        top.instances[2].allocated.as_ref().unwrap().to_text().unwrap(),
        "[4*LANES + 8 +: 16]"
    );
}

#[test]
fn missing_submodule_names_the_instance() {
    let err = generate(&[("top.v", TWO_COUNTERS)], "TOP").unwrap_err();
    match err {
        StateError::ModuleNotFound {
            name,
            referenced_by,
            ..
        } => {
            assert_eq!(name, "A");
            assert_eq!(referenced_by.as_deref(), Some("TOP.a0"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn missing_root_is_reported() {
    let err = generate(&[("a.v", COUNTER)], "TOP").unwrap_err();
    assert_eq!(err.to_string(), "module `TOP` not found");
}

#[test]
fn instantiation_cycles_are_rejected() {
    let source = "\
module ping (input clk);
  reg r;
  always @(posedge clk) r <= ~r;
  pong p (.clk(clk));
endmodule
module pong (input clk);
  ping p (.clk(clk));
endmodule
";
    let err = generate(&[("loop.v", source)], "ping").unwrap_err();
    match err {
        StateError::InstantiationCycle { cycle } => {
            assert_eq!(cycle, vec!["ping", "pong", "ping"])
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn duplicate_module_across_files() {
    let err = load(
        &[("a.v", COUNTER), ("b.v", COUNTER)],
        &AutossConfig::default(),
    )
    .err()
    .unwrap();
    match err {
        StateError::DuplicateModule {
            name,
            first,
            second,
            ..
        } => {
            assert_eq!(name, "A");
            assert_eq!(first, "a.v");
            assert_eq!(second, "b.v");
        }
        other => panic!("unexpected error {other:?}"),
    }
}
