//! Name resolution and register liveness, in one forward walk over the tree.
//!
//! Every value-producing node without a compile-time value gets a register claimed
//! at its own index. A consumer extends the liveness of each operand register to its
//! own index, so a register becomes reusable as soon as the last consumer has run.
//! Registers bound to names are held until the declaring scope is left.

use std::collections::BTreeMap;

use tracing::{debug, instrument, trace};

use crate::{
    context::{FlowContext, MethodReturnKind, UserDefinedConstant, UserDefinedVariable, UserVariableId},
    error::{Diagnostic, FlowError},
    lang::{ArrayInitializer, Block, Node, NodeId, NodeKind, SyntaxTree, node::is_in_expression_list},
    resolution::{Resolutions, builtin_constant},
    scope::{ScopeId, ScopeTree, VariableId},
};

type VisitResult<T = Option<VariableId>> = Result<T, Diagnostic>;

/// Which operator nodes count as compile-time known during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Folding {
    /// Only values the tree already carries: literals and operations folded upstream.
    #[default]
    Upstream,
    /// Operations whose operands become known while resolving, such as named constants, are
    /// evaluated too and claim no register.
    ThroughConstants,
}

/// Resolves every node of `tree`, filling the scope tree, the registry and the pin table.
///
/// `context` must already know every method the program calls.
pub fn resolve(tree: &mut SyntaxTree, context: &mut FlowContext) -> Result<Resolutions, Diagnostic> {
    resolve_with(tree, context, Folding::Upstream)
}

#[instrument(skip_all, fields(nodes = tree.len(), ?folding))]
pub fn resolve_with(
    tree: &mut SyntaxTree,
    context: &mut FlowContext,
    folding: Folding,
) -> Result<Resolutions, Diagnostic> {
    let SyntaxTree {
        nodes,
        scopes,
        root,
    } = tree;
    let nodes: &[Node] = nodes;
    let mut visitor = VariableVisitor {
        nodes,
        scopes,
        device_pins: &mut root.device_pins,
        context,
        resolutions: Resolutions::from_nodes(nodes),
        owners: BTreeMap::new(),
        folding,
    };
    visitor.visit_block(&root.body)?;

    debug!(
        registers = visitor.scopes.variables().len(),
        variables = visitor.context.user_variables().len(),
        constants = visitor.context.user_constants().len(),
        "resolution complete"
    );
    Ok(visitor.resolutions)
}

struct VariableVisitor<'a> {
    nodes: &'a [Node],
    scopes: &'a mut ScopeTree,
    device_pins: &'a mut BTreeMap<String, String>,
    context: &'a mut FlowContext,
    resolutions: Resolutions,
    /// Register frame each claim was made in. Liveness only moves on its own frame's clock.
    owners: BTreeMap<VariableId, ScopeId>,
    folding: Folding,
}

/// Wraps an error with the position of the node that raised it.
fn at(node: &Node, id: NodeId) -> impl FnOnce(FlowError) -> Diagnostic + use<> {
    let index_in_scope = node.index_in_scope;
    move |error| Diagnostic {
        node: id,
        index_in_scope,
        error,
    }
}

impl VariableVisitor<'_> {
    fn visit_block(&mut self, block: &Block) -> VisitResult<()> {
        for &statement in &block.statements {
            self.visit(statement)?;
        }
        self.scopes.release(block.scope);
        Ok(())
    }

    /// Visits `id` and returns the register holding its value, if any.
    fn visit(&mut self, id: NodeId) -> VisitResult {
        let nodes = self.nodes;
        let node = &nodes[id.index()];
        trace!(node = %id, index = node.index_in_scope, kind = node.kind.label(), "visit");

        match &node.kind {
            NodeKind::VariableDeclaration { name, expression } => {
                self.visit_variable_declaration(id, node, name, *expression)
            }
            NodeKind::ConstantDeclaration { name, expression } => {
                self.visit_constant_declaration(id, node, name, *expression)
            }
            NodeKind::VariableAssignment { name, expression } => {
                self.visit_assignment(id, node, name, *expression)
            }
            NodeKind::ValueAccess { name } => self.visit_value_access(id, node, name),
            NodeKind::PinDeclaration { name, device } => {
                self.declare_pin(name, device).map_err(at(node, id))?;
                Ok(None)
            }
            NodeKind::MethodDeclaration {
                parameters, body, ..
            } => {
                for &parameter in parameters {
                    self.visit_parameter(parameter)?;
                }
                self.visit_block(body)?;
                Ok(None)
            }
            NodeKind::MethodCall { name, .. } => {
                let returns = self
                    .context
                    .method_return_kind(name)
                    .ok_or_else(|| FlowError::UndefinedIdentifier { name: name.clone() })
                    .map_err(at(node, id))?;
                if returns == MethodReturnKind::Void && is_in_expression_list(nodes, id) {
                    return Err(at(node, id)(FlowError::VoidValueUsed { name: name.clone() }));
                }
                self.visit_default(id, node, returns == MethodReturnKind::Value)
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.visit_condition(node, *condition)?;
                self.visit_block(then_branch)?;
                self.visit_block(else_branch)?;
                Ok(None)
            }
            NodeKind::For {
                has_initializer,
                condition,
                body,
            } => {
                let mut statements = body.statements.iter().copied();
                if *has_initializer {
                    if let Some(initializer) = statements.next() {
                        self.visit(initializer)?;
                    }
                }
                self.visit_condition(node, *condition)?;
                for statement in statements {
                    self.visit(statement)?;
                }
                self.scopes.release(body.scope);
                Ok(None)
            }
            NodeKind::ArrayDeclaration { name, initializer } => {
                self.visit_array_declaration(id, node, name, initializer)
            }
            NodeKind::ArrayAssignment { name, value, index } => {
                self.visit_array_assignment(id, node, name, *value, *index)
            }
            NodeKind::ArrayAccess { name, index } => self.visit_array_access(id, node, name, *index),
            NodeKind::DeviceRead { pin, .. } | NodeKind::DeviceWrite { pin, .. } => {
                if !self.device_pins.contains_key(pin) {
                    return Err(at(node, id)(FlowError::UndefinedIdentifier { name: pin.clone() }));
                }
                self.visit_default(id, node, node.kind.produces_value())
            }
            _ => self.visit_default(id, node, node.kind.produces_value()),
        }
    }

    /// Sub-expressions, then nested blocks, then a register for the node itself if it yields one.
    fn visit_default(&mut self, id: NodeId, node: &Node, claims_result: bool) -> VisitResult {
        // A node holding more than one live result keeps its operands one tick longer.
        let consumed_at = node.index_in_scope + usize::from(node.index_size > 1);
        for child in node.kind.expressions() {
            if let Some(variable) = self.visit(child)? {
                self.extend_reference(variable, consumed_at, node.scope);
            }
        }
        for block in node.kind.blocks() {
            self.visit_block(block)?;
        }

        if self.folding == Folding::ThroughConstants && self.resolutions.ct_known_value(id).is_none() {
            let resolutions = &self.resolutions;
            let folded = node.kind.evaluate(|operand| resolutions.ct_known_value(operand));
            if let Some(value) = folded {
                trace!(node = %id, %value, "folded");
                self.resolutions.get_mut(id).ct_known_value = Some(value);
            }
        }

        if claims_result && self.resolutions.ct_known_value(id).is_none() {
            return self.claim(id, node).map(Some);
        }
        Ok(None)
    }

    fn visit_variable_declaration(
        &mut self,
        id: NodeId,
        node: &Node,
        name: &str,
        expression: NodeId,
    ) -> VisitResult {
        if let Some(initializer) = self.visit(expression)? {
            self.extend_reference(initializer, node.index_in_scope, node.scope);
        }
        let ct_initialized = self.resolutions.ct_known_value(expression).is_some();

        let variable = self.claim(id, node)?;
        self.declare_variable(id, node, name, variable, ct_initialized, false)?;
        Ok(None)
    }

    fn visit_constant_declaration(
        &mut self,
        id: NodeId,
        node: &Node,
        name: &str,
        expression: NodeId,
    ) -> VisitResult {
        self.visit(expression)?;
        let value = self
            .resolutions
            .ct_known_value(expression)
            .ok_or_else(|| FlowError::NonConstantInitializer {
                name: name.to_string(),
            })
            .map_err(at(node, id))?;

        let constant = self.context.push_user_constant(UserDefinedConstant::new(
            name,
            value,
            node.scope,
            node.index_in_scope,
        ));
        self.scopes
            .add_user_constant(node.scope, name, constant)
            .map_err(at(node, id))?;
        self.resolutions.get_mut(id).ct_known_value = Some(value);
        debug!(name, %value, index = node.index_in_scope, "declared constant");
        Ok(None)
    }

    fn visit_assignment(
        &mut self,
        id: NodeId,
        node: &Node,
        name: &str,
        expression: NodeId,
    ) -> VisitResult {
        let target = self.lookup_variable(id, node, name)?;
        let variable = self.context.user_variable(target).variable;
        if self.is_local(variable, node.scope) {
            self.context
                .user_variable_mut(target)
                .extend_reassignment(node.index_in_scope);
            self.scopes
                .variable_mut(variable)
                .extend_reassignment(node.index_in_scope);
        }
        self.resolutions.get_mut(id).variable = Some(variable);

        if let Some(value) = self.visit(expression)? {
            self.extend_reference(value, node.index_in_scope, node.scope);
        }
        Ok(Some(variable))
    }

    /// Builtin constants first, then variables, then constants.
    fn visit_value_access(&mut self, id: NodeId, node: &Node, name: &str) -> VisitResult {
        if let Some(builtin) = builtin_constant(name) {
            self.resolutions.get_mut(id).builtin_constant = Some(builtin);
            return Ok(None);
        }

        if let Some(target) = self.scopes.try_get_user_variable(node.scope, name) {
            let variable = self.context.user_variable(target).variable;
            if self.is_local(variable, node.scope) {
                self.context
                    .user_variable_mut(target)
                    .extend_reference(node.index_in_scope);
                self.scopes
                    .variable_mut(variable)
                    .extend_reference(node.index_in_scope);
            }
            self.resolutions.get_mut(id).variable = Some(variable);
            return Ok(Some(variable));
        }

        if let Some(target) = self.scopes.try_get_user_constant(node.scope, name) {
            let same_frame =
                self.scopes.frame_of(self.context.user_constant(target).scope) == self.scopes.frame_of(node.scope);
            let constant = self.context.user_constant_mut(target);
            if same_frame {
                constant.extend_reference(node.index_in_scope);
            }
            self.resolutions.get_mut(id).ct_known_value = Some(constant.ct_known_value);
            return Ok(None);
        }

        Err(at(node, id)(FlowError::UndefinedIdentifier {
            name: name.to_string(),
        }))
    }

    fn visit_parameter(&mut self, id: NodeId) -> VisitResult<()> {
        let nodes = self.nodes;
        let node = &nodes[id.index()];
        if let NodeKind::Parameter { name } = &node.kind {
            let variable = self.claim(id, node)?;
            self.declare_variable(id, node, name, variable, false, false)?;
        }
        Ok(())
    }

    /// A condition is consumed at the branch point, or at its own declaration if that comes later.
    fn visit_condition(&mut self, node: &Node, condition: NodeId) -> VisitResult<()> {
        if let Some(variable) = self.visit(condition)? {
            let declared_at = self.scopes.variable(variable).declare_index;
            self.extend_reference(variable, node.index_in_scope.max(declared_at), node.scope);
        }
        Ok(())
    }

    fn visit_array_declaration(
        &mut self,
        id: NodeId,
        node: &Node,
        name: &str,
        initializer: &ArrayInitializer,
    ) -> VisitResult {
        let address = self.claim(id, node)?;
        let array = self.declare_variable(id, node, name, address, false, true)?;
        self.resolutions.get_mut(id).array_address = Some(array);

        // Size and elements are consumed where they are produced.
        match initializer {
            ArrayInitializer::Size(size) => {
                self.visit(*size)?;
            }
            ArrayInitializer::List(elements) => {
                for &element in elements {
                    self.visit(element)?;
                }
            }
        }
        Ok(None)
    }

    fn visit_array_assignment(
        &mut self,
        id: NodeId,
        node: &Node,
        name: &str,
        value: NodeId,
        index: NodeId,
    ) -> VisitResult {
        let array = self.lookup_variable(id, node, name)?;
        self.reference_variable(array, node);
        self.resolutions.get_mut(id).array_address = Some(array);
        self.claim(id, node)?;

        // Both operands outlive the store's own register by one tick.
        for operand in [value, index] {
            if let Some(variable) = self.visit(operand)? {
                self.extend_reference(variable, node.index_in_scope + 1, node.scope);
            }
        }
        Ok(None)
    }

    fn visit_array_access(
        &mut self,
        id: NodeId,
        node: &Node,
        name: &str,
        index: NodeId,
    ) -> VisitResult {
        let array = self.lookup_variable(id, node, name)?;
        self.reference_variable(array, node);
        self.resolutions.get_mut(id).array_address = Some(array);

        if let Some(variable) = self.visit(index)? {
            self.extend_reference(variable, node.index_in_scope, node.scope);
        }
        self.claim(id, node).map(Some)
    }

    fn declare_pin(&mut self, name: &str, device: &str) -> Result<(), FlowError> {
        if self.device_pins.contains_key(name) {
            return Err(FlowError::DuplicateDeclaration {
                name: name.to_string(),
            });
        }
        if self.device_pins.values().any(|bound| bound == device) {
            return Err(FlowError::DuplicateDeclaration {
                name: device.to_string(),
            });
        }
        self.device_pins.insert(name.to_string(), device.to_string());
        debug!(pin = name, device, "declared pin");
        Ok(())
    }

    fn claim(&mut self, id: NodeId, node: &Node) -> VisitResult<VariableId> {
        let variable = self
            .scopes
            .claim_new_variable(node.scope, node.index_in_scope)
            .map_err(at(node, id))?;
        self.owners.insert(variable, self.scopes.frame_of(node.scope));
        self.resolutions.get_mut(id).variable = Some(variable);
        Ok(variable)
    }

    fn declare_variable(
        &mut self,
        id: NodeId,
        node: &Node,
        name: &str,
        variable: VariableId,
        ct_initialized: bool,
        is_array: bool,
    ) -> VisitResult<UserVariableId> {
        let mut record = UserDefinedVariable::new(
            name,
            variable,
            node.scope,
            node.index_in_scope,
            ct_initialized,
        );
        record.is_array = is_array;
        let declared = self.context.push_user_variable(record);
        self.scopes
            .add_user_variable(node.scope, name, declared)
            .map_err(at(node, id))?;
        self.scopes.hold(node.scope, variable);

        debug!(
            name,
            register = %self.scopes.variable(variable).register,
            index = node.index_in_scope,
            ct_initialized,
            "declared variable"
        );
        Ok(declared)
    }

    fn lookup_variable(&self, id: NodeId, node: &Node, name: &str) -> VisitResult<UserVariableId> {
        self.scopes
            .try_get_user_variable(node.scope, name)
            .ok_or_else(|| FlowError::UndefinedIdentifier {
                name: name.to_string(),
            })
            .map_err(at(node, id))
    }

    /// Extends a named binding and its register to `node`'s index.
    fn reference_variable(&mut self, target: UserVariableId, node: &Node) {
        let variable = self.context.user_variable(target).variable;
        if self.is_local(variable, node.scope) {
            self.context
                .user_variable_mut(target)
                .extend_reference(node.index_in_scope);
            self.scopes
                .variable_mut(variable)
                .extend_reference(node.index_in_scope);
        }
    }

    fn extend_reference(&mut self, variable: VariableId, index: usize, scope: ScopeId) {
        if self.is_local(variable, scope) {
            self.scopes.variable_mut(variable).extend_reference(index);
        }
    }

    /// Whether `variable` was claimed on the clock `scope` runs on.
    fn is_local(&self, variable: VariableId, scope: ScopeId) -> bool {
        self.owners.get(&variable) == Some(&self.scopes.frame_of(scope))
    }
}
