//! Module items: declarations, instantiations, processes and generate
//! constructs.

use crate::kinds::NodeKind;
use crate::parser::TreeBuilder;
use crate::tree::NodeId;

/// Keywords that start a variable declaration.
const VARIABLE_TYPES: &[&str] = &[
    "reg", "logic", "integer", "bit", "byte", "int", "shortint", "longint", "time", "real",
    "var", "signed", "unsigned", "const", "static", "automatic",
];

/// Keywords that start a net declaration.
const NET_TYPES: &[&str] = &["wire", "tri", "wand", "wor", "supply0", "supply1", "uwire"];

const PROCESSES: &[&str] = &["always", "always_ff", "always_comb", "always_latch"];

impl TreeBuilder<'_> {
    /// Parses items until one of `terminators` (not consumed).
    pub(crate) fn parse_module_items(&mut self, terminators: &[&str]) -> Vec<NodeId> {
        let mut items = Vec::new();
        while !self.at_end() && !self.at_any(terminators) {
            if self.at_any(&["endmodule", "module"]) {
                break;
            }
            let item = self.parse_module_item();
            items.push(item);
        }
        if self.at_end() || !self.at_any(terminators) {
            self.expected(&format!("`{}`", terminators.join("` or `")));
        }
        items
    }

    fn parse_module_item(&mut self) -> NodeId {
        let word = self.text().to_string();
        match word.as_str() {
            "parameter" | "localparam" => self.parse_param_declaration(),
            "input" | "output" | "inout" => self.parse_module_port_declaration(),
            w if VARIABLE_TYPES.contains(&w) => self.parse_variable_declaration(),
            w if NET_TYPES.contains(&w) => self.generic_item(NodeKind::NetDeclaration),
            w if PROCESSES.contains(&w) => {
                let kw = self.bump();
                let body = self.parse_statement();
                self.node(NodeKind::AlwaysStatement, vec![kw, body])
            }
            "initial" | "final" => {
                let kw = self.bump();
                let body = self.parse_statement();
                self.node(NodeKind::InitialStatement, vec![kw, body])
            }
            "assign" => self.generic_item(NodeKind::ContinuousAssignmentStatement),
            "genvar" => self.generic_item(NodeKind::GenvarDeclaration),
            "generate" => {
                let mut children = Vec::new();
                let kw = self.bump();
                children.push(kw);
                let items = self.parse_module_items(&["endgenerate"]);
                children.extend(items);
                self.expect("endgenerate", &mut children);
                self.node(NodeKind::GenerateRegion, children)
            }
            "for" => {
                let kw = self.bump();
                let header = self.paren_group();
                let body = self.parse_generate_item();
                self.node(NodeKind::LoopGenerateConstruct, vec![kw, header, body])
            }
            "if" => {
                let kw = self.bump();
                let cond = self.paren_group();
                let body = self.parse_generate_item();
                let mut children = vec![kw, cond, body];
                if self.eat("else", &mut children) {
                    let other = self.parse_generate_item();
                    children.push(other);
                }
                self.node(NodeKind::ConditionalGenerateConstruct, children)
            }
            "case" => {
                let children = self.tokens_through("endcase");
                self.node(NodeKind::ConditionalGenerateConstruct, children)
            }
            "begin" => self.parse_generate_block(),
            "function" => {
                let children = self.tokens_through("endfunction");
                self.node(NodeKind::FunctionDeclaration, children)
            }
            "task" => {
                let children = self.tokens_through("endtask");
                self.node(NodeKind::TaskDeclaration, children)
            }
            _ if self.at_ident() && (self.ident_at(1) || self.peek_is(1, "#")) => {
                self.parse_instantiation()
            }
            _ => self.generic_item(NodeKind::Other("kModuleItem".to_string())),
        }
    }

    fn generic_item(&mut self, kind: NodeKind) -> NodeId {
        let mut children = Vec::new();
        self.until_semicolon(&mut children);
        self.node(kind, children)
    }

    /// Consumes tokens through `closer` and an optional `: label`.
    fn tokens_through(&mut self, closer: &str) -> Vec<NodeId> {
        let mut children = Vec::new();
        while !self.at_end() && !self.at(closer) && !self.at("endmodule") {
            let tok = self.bump();
            children.push(tok);
        }
        self.expect(closer, &mut children);
        if self.at(":") && self.ident_at(1) {
            let colon = self.bump();
            let label = self.bump();
            children.extend([colon, label]);
        }
        children
    }

    fn parse_generate_item(&mut self) -> NodeId {
        if self.at("begin") {
            self.parse_generate_block()
        } else {
            self.parse_module_item()
        }
    }

    fn parse_generate_block(&mut self) -> NodeId {
        let mut children = Vec::new();
        let begin = self.bump();
        children.push(begin);
        self.optional_label(&mut children);
        let items = self.parse_module_items(&["end"]);
        children.extend(items);
        self.expect("end", &mut children);
        self.optional_label(&mut children);
        self.node(NodeKind::GenerateBlock, children)
    }

    pub(crate) fn optional_label(&mut self, out: &mut Vec<NodeId>) {
        if self.at(":") && self.ident_at(1) {
            let colon = self.bump();
            let label = self.bump();
            out.extend([colon, label]);
        }
    }

    /// `parameter [type] A = 1, B = 2;`
    fn parse_param_declaration(&mut self) -> NodeId {
        let mut children = self.param_item_children(&[",", ";"]);
        let mut rest = Vec::new();
        while self.eat(",", &mut rest) {
            let mut assign = Vec::new();
            self.expect_ident(&mut assign);
            if self.at("[") {
                let dims = self.dimensions(NodeKind::UnpackedDimensions);
                assign.push(dims);
            }
            self.expect("=", &mut assign);
            if let Some(value) = self.expression(&[",", ";"]) {
                assign.push(value);
            }
            let assign = self.node(NodeKind::ParameterAssign, assign);
            rest.push(assign);
        }
        self.expect(";", &mut rest);
        children.extend(rest);
        self.node(NodeKind::ParamDeclaration, children)
    }

    /// `input [reg] [signed] [7:0] a, b [0:3];`
    fn parse_module_port_declaration(&mut self) -> NodeId {
        let mut children = Vec::new();
        while !self.at_end() && !self.at_ident() && !self.at(";") && !self.at("endmodule") {
            if self.at("[") {
                let dims = self.dimensions(NodeKind::PackedDimensions);
                children.push(dims);
            } else {
                let tok = self.bump();
                children.push(tok);
            }
        }
        // A user-defined type name precedes the declared names.
        if self.at_ident() && self.ident_at(1) {
            let ty = self.bump();
            children.push(ty);
            if self.at("[") {
                let dims = self.dimensions(NodeKind::PackedDimensions);
                children.push(dims);
            }
        }
        let list = self.identifier_list(
            NodeKind::IdentifierUnpackedDimensionsList,
            NodeKind::IdentifierUnpackedDimensions,
        );
        children.push(list);
        self.expect(";", &mut children);
        self.node(NodeKind::ModulePortDeclaration, children)
    }

    /// `NAME [dims] [= init], ...` wrapped as `list_kind[item_kind, ',', ...]`.
    fn identifier_list(&mut self, list_kind: NodeKind, item_kind: NodeKind) -> NodeId {
        let mut list = Vec::new();
        loop {
            let mut item = Vec::new();
            if !self.expect_ident(&mut item) {
                break;
            }
            if self.at("[") {
                let dims = self.dimensions(NodeKind::UnpackedDimensions);
                item.push(dims);
            }
            if self.eat("=", &mut item) {
                if let Some(init) = self.expression(&[",", ";"]) {
                    item.push(init);
                }
            }
            let item = self.node(item_kind.clone(), item);
            list.push(item);
            if !self.eat(",", &mut list) {
                break;
            }
        }
        self.node(list_kind, list)
    }

    /// `reg [7:0] a, b [0:3];`
    fn parse_variable_declaration(&mut self) -> NodeId {
        let mut ty = Vec::new();
        while !self.at_end() && !self.at_ident() && !self.at(";") && !self.at("endmodule") {
            if self.at("[") {
                let dims = self.dimensions(NodeKind::PackedDimensions);
                ty.push(dims);
            } else {
                let tok = self.bump();
                ty.push(tok);
            }
        }
        let data_type = self.node(NodeKind::DataType, ty);
        let inst_type = self.node(NodeKind::InstantiationType, vec![data_type]);
        let vars = self.identifier_list(
            NodeKind::GateInstanceRegisterVariableList,
            NodeKind::RegisterVariable,
        );
        let mut children = vec![inst_type, vars];
        self.expect(";", &mut children);
        self.node(NodeKind::DataDeclaration, children)
    }

    /// `type #(params) name (ports), ...;` and user-typed variables.
    fn parse_instantiation(&mut self) -> NodeId {
        let name = self.bump();
        let id = self.node(NodeKind::UnqualifiedId, vec![name]);
        let mut ty = vec![id];
        if self.at("#") {
            let params = self.parse_actual_parameters();
            ty.push(params);
        }
        let data_type = self.node(NodeKind::DataType, ty);
        let inst_type = self.node(NodeKind::InstantiationType, vec![data_type]);

        let mut list = Vec::new();
        loop {
            let mut item = Vec::new();
            if !self.expect_ident(&mut item) {
                break;
            }
            if self.at("[") {
                let dims = self.dimensions(NodeKind::UnpackedDimensions);
                item.push(dims);
            }
            let kind = if self.at("(") {
                let open = self.bump();
                item.push(open);
                let ports = self.parse_port_actuals();
                item.push(ports);
                self.expect(")", &mut item);
                NodeKind::GateInstance
            } else {
                if self.eat("=", &mut item) {
                    if let Some(init) = self.expression(&[",", ";"]) {
                        item.push(init);
                    }
                }
                NodeKind::RegisterVariable
            };
            let item = self.node(kind, item);
            list.push(item);
            if !self.eat(",", &mut list) {
                break;
            }
        }
        let list = self.node(NodeKind::GateInstanceRegisterVariableList, list);
        let mut children = vec![inst_type, list];
        self.expect(";", &mut children);
        self.node(NodeKind::DataDeclaration, children)
    }

    /// `#(8, 4)`, `#(.W(8))` or `#8`.
    fn parse_actual_parameters(&mut self) -> NodeId {
        let hash = self.bump();
        let mut children = vec![hash];
        if !self.at("(") {
            if !self.at_end() {
                let value = self.bump();
                let list = self.node(NodeKind::ActualParameterPositionalList, vec![value]);
                children.push(list);
            }
            return self.node(NodeKind::ActualParameterList, children);
        }
        let open = self.bump();
        children.push(open);
        if !self.at(")") {
            let by_name = self.at(".");
            let mut list = Vec::new();
            loop {
                let before = list.len();
                if by_name {
                    let param = self.parse_param_by_name();
                    list.push(param);
                } else if let Some(value) = self.expression(&[","]) {
                    list.push(value);
                }
                if !self.eat(",", &mut list) {
                    if list.len() == before {
                        self.expected("parameter value");
                    }
                    break;
                }
            }
            let kind = if by_name {
                NodeKind::ActualParameterByNameList
            } else {
                NodeKind::ActualParameterPositionalList
            };
            let list = self.node(kind, list);
            children.push(list);
        }
        self.expect(")", &mut children);
        self.node(NodeKind::ActualParameterList, children)
    }

    /// `.NAME(value)`
    fn parse_param_by_name(&mut self) -> NodeId {
        let mut children = Vec::new();
        self.expect(".", &mut children);
        self.expect_ident(&mut children);
        if self.at("(") {
            let mut group = Vec::new();
            let open = self.bump();
            group.push(open);
            if let Some(value) = self.expression(&[]) {
                group.push(value);
            }
            self.expect(")", &mut group);
            let group = self.node(NodeKind::ParenGroup, group);
            children.push(group);
        }
        self.node(NodeKind::ParamByName, children)
    }

    /// Port connections up to (not including) the closing `)`.
    fn parse_port_actuals(&mut self) -> NodeId {
        let mut list = Vec::new();
        while !self.at_end() && !self.at(")") && !self.at(";") && !self.at("endmodule") {
            let before = self.pos_marker();
            if self.at(".") && self.ident_at(1) {
                let mut port = Vec::new();
                let dot = self.bump();
                let name = self.bump();
                port.extend([dot, name]);
                if self.at("(") {
                    let open = self.bump();
                    port.push(open);
                    if let Some(value) = self.expression(&[]) {
                        port.push(value);
                    }
                    self.expect(")", &mut port);
                }
                let port = self.node(NodeKind::ActualNamedPort, port);
                list.push(port);
            } else if let Some(value) = self.expression(&[","]) {
                list.push(value);
            }
            if !self.eat(",", &mut list) && self.pos_marker() == before {
                // `.*` and other stray tokens.
                let tok = self.bump();
                list.push(tok);
            }
        }
        self.node(NodeKind::PortActualList, list)
    }
}
