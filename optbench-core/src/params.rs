//! Trainable parameters shared between a test problem and its optimizer.
//!
//! The problem owns the [`ParameterSet`]; back-propagation writes into the
//! `grad` buffers and the optimizer reads them when it updates `value`.

/// A named, flat parameter tensor together with its gradient buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Vec<f64>,
    pub grad: Vec<f64>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Vec<f64>) -> Self {
        let grad = vec![0.0; value.len()];
        Self {
            name: name.into(),
            value,
            grad,
        }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Ordered collection of the trainable parameters of one test problem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    pub fn push(&mut self, param: Parameter) {
        self.params.push(param);
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.iter_mut().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.params.iter_mut()
    }

    /// Number of parameter tensors.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Total number of scalar weights across all tensors.
    pub fn num_elements(&self) -> usize {
        self.params.iter().map(Parameter::len).sum()
    }

    /// Shapes in parameter order, used by optimizers to size their state.
    pub fn shapes(&self) -> Vec<usize> {
        self.params.iter().map(Parameter::len).collect()
    }

    pub fn zero_grad(&mut self) {
        for param in &mut self.params {
            param.grad.iter_mut().for_each(|g| *g = 0.0);
        }
    }
}

impl FromIterator<Parameter> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}
