//! Procedural statements.

use crate::kinds::NodeKind;
use crate::parser::TreeBuilder;
use crate::tree::NodeId;

/// Keywords that end a statement list.
const BLOCK_END: &[&str] = &[
    "end", "endmodule", "endcase", "endgenerate", "endfunction", "endtask", "join", "join_any",
    "join_none", "else",
];

impl TreeBuilder<'_> {
    pub(crate) fn parse_statement(&mut self) -> NodeId {
        if self.at_end() || self.at_any(BLOCK_END) {
            self.expected("statement");
            return self.node(NodeKind::Statement, Vec::new());
        }
        let word = self.text().to_string();
        match word.as_str() {
            "begin" => self.parse_seq_block("begin", &["end"]),
            "fork" => self.parse_seq_block("fork", &["join", "join_any", "join_none"]),
            "unique" | "unique0" | "priority" => {
                let prefix = self.bump();
                if self.at("if") {
                    self.parse_conditional(Some(prefix))
                } else {
                    self.parse_case(Some(prefix))
                }
            }
            "if" => self.parse_conditional(None),
            "case" | "casex" | "casez" => self.parse_case(None),
            "for" => {
                let kw = self.bump();
                let header = self.paren_group();
                let body = self.parse_statement();
                self.node(NodeKind::ForLoopStatement, vec![kw, header, body])
            }
            "while" | "repeat" => {
                let kw = self.bump();
                let header = self.paren_group();
                let body = self.parse_statement();
                self.node(NodeKind::LoopStatement, vec![kw, header, body])
            }
            "forever" => {
                let kw = self.bump();
                let body = self.parse_statement();
                self.node(NodeKind::LoopStatement, vec![kw, body])
            }
            "@" => {
                let control = self.parse_event_control();
                let body = self.parse_statement();
                self.node(NodeKind::ProceduralTimingControlStatement, vec![control, body])
            }
            "#" => {
                let delay = self.parse_delay();
                let body = self.parse_statement();
                self.node(NodeKind::ProceduralTimingControlStatement, vec![delay, body])
            }
            ";" => {
                let semi = self.bump();
                self.node(NodeKind::NullStatement, vec![semi])
            }
            _ => self.parse_simple_statement(),
        }
    }

    /// `begin [: label] stmts end [: label]`; `fork ... join` uses the same shape.
    fn parse_seq_block(&mut self, open: &str, closers: &[&str]) -> NodeId {
        let mut begin = Vec::new();
        self.expect(open, &mut begin);
        self.optional_label(&mut begin);
        let begin = self.node(NodeKind::Begin, begin);

        let mut children = vec![begin];
        while !self.at_end() && !self.at_any(BLOCK_END) {
            let stmt = self.parse_statement();
            children.push(stmt);
        }

        let mut end = Vec::new();
        if self.at_any(closers) {
            let closer = self.bump();
            end.push(closer);
            self.optional_label(&mut end);
        } else {
            self.expected(&format!("`{}`", closers[0]));
        }
        let end = self.node(NodeKind::End, end);
        children.push(end);
        self.node(NodeKind::SeqBlock, children)
    }

    fn parse_conditional(&mut self, prefix: Option<NodeId>) -> NodeId {
        let mut header: Vec<NodeId> = prefix.into_iter().collect();
        self.expect("if", &mut header);
        let mut cond = Vec::new();
        self.expect("(", &mut cond);
        if let Some(expr) = self.expression(&[]) {
            cond.push(expr);
        }
        self.expect(")", &mut cond);
        let cond = self.node(NodeKind::ParenGroup, cond);
        header.push(cond);
        let header = self.node(NodeKind::IfHeader, header);

        let body = self.parse_statement();
        let body = self.node(NodeKind::IfBody, vec![body]);
        let if_clause = self.node(NodeKind::IfClause, vec![header, body]);

        let mut children = vec![if_clause];
        if self.at("else") {
            let kw = self.bump();
            let body = self.parse_statement();
            let body = self.node(NodeKind::ElseBody, vec![body]);
            let else_clause = self.node(NodeKind::ElseClause, vec![kw, body]);
            children.push(else_clause);
        }
        self.node(NodeKind::ConditionalStatement, children)
    }

    fn parse_case(&mut self, prefix: Option<NodeId>) -> NodeId {
        let mut children: Vec<NodeId> = prefix.into_iter().collect();
        if self.at_any(&["case", "casex", "casez"]) {
            let kw = self.bump();
            children.push(kw);
        } else {
            self.expected("`case`");
        }
        self.expect("(", &mut children);
        if let Some(expr) = self.expression(&[]) {
            children.push(expr);
        }
        self.expect(")", &mut children);

        let mut items = Vec::new();
        while !self.at_end() && !self.at_any(BLOCK_END) {
            let mut item = Vec::new();
            let kind = if self.at("default") {
                let kw = self.bump();
                item.push(kw);
                self.eat(":", &mut item);
                NodeKind::DefaultCaseItem
            } else {
                match self.expression(&[":"]) {
                    Some(labels) => item.push(labels),
                    None => {
                        self.expected("case item");
                        break;
                    }
                }
                self.expect(":", &mut item);
                NodeKind::CaseItem
            };
            let stmt = self.parse_statement();
            item.push(stmt);
            let item = self.node(kind, item);
            items.push(item);
        }
        let items = self.node(NodeKind::CaseItemList, items);
        children.push(items);
        self.expect("endcase", &mut children);
        self.node(NodeKind::CaseStatement, children)
    }

    /// `@(posedge clk or negedge rst_n)`, `@*`, `@(*)`, `@name`.
    fn parse_event_control(&mut self) -> NodeId {
        let at = self.bump();
        let mut children = vec![at];
        if self.at("*") {
            let star = self.bump();
            children.push(star);
        } else if self.at("(") {
            let open = self.bump();
            children.push(open);
            if self.at("*") {
                let star = self.bump();
                children.push(star);
            } else {
                let mut events = Vec::new();
                loop {
                    let mut event = Vec::new();
                    if self.at_any(&["posedge", "negedge", "edge"]) {
                        let edge = self.bump();
                        event.push(edge);
                    }
                    match self.expression(&["or", ","]) {
                        Some(signal) => event.push(signal),
                        None => self.expected("event expression"),
                    }
                    let event = self.node(NodeKind::EventExpression, event);
                    events.push(event);
                    if !self.eat("or", &mut events) && !self.eat(",", &mut events) {
                        break;
                    }
                }
                let list = self.node(NodeKind::EventExpressionList, events);
                children.push(list);
            }
            self.expect(")", &mut children);
        } else if self.at_ident() {
            let signal = self.bump();
            children.push(signal);
        } else {
            self.expected("event control");
        }
        self.node(NodeKind::EventControl, children)
    }

    /// `#5`, `#(DELAY)`.
    fn parse_delay(&mut self) -> NodeId {
        let hash = self.bump();
        let value = if self.at("(") {
            self.paren_group()
        } else if self.at_end() {
            return self.node(NodeKind::DelayControl, vec![hash]);
        } else {
            self.bump()
        };
        self.node(NodeKind::DelayControl, vec![hash, value])
    }

    /// Assignments and any other statement ending in `;`.
    fn parse_simple_statement(&mut self) -> NodeId {
        let mut lhs = Vec::new();
        let mut depth = 0usize;
        while !self.at_end() && !self.at(";") && !self.at_any(BLOCK_END) && !self.at("begin") {
            if depth == 0 && self.at_any(&["<=", "="]) {
                break;
            }
            match self.text() {
                "(" | "[" | "{" | "'{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                _ => {}
            }
            let tok = self.bump();
            lhs.push(tok);
        }

        let kind = if self.at("<=") {
            NodeKind::NonblockingAssignmentStatement
        } else if self.at("=") {
            NodeKind::BlockingAssignmentStatement
        } else {
            // Calls, `disable`, `return`, ...
            let mut children = lhs;
            self.expect(";", &mut children);
            return self.node(NodeKind::Statement, children);
        };

        let target = self.node(NodeKind::LPValue, lhs);
        let op = self.bump();
        let mut children = vec![target, op];
        if let Some(rhs) = self.expression(&[]) {
            children.push(rhs);
        } else {
            self.expected("expression");
        }
        self.expect(";", &mut children);
        self.node(kind, children)
    }
}
