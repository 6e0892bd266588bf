/// One named vertex attribute and its byte width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttr {
    pub name: &'static str,
    pub bytes: usize,
}

impl VertexAttr {
    pub const fn new(name: &'static str, bytes: usize) -> Self {
        Self { name, bytes }
    }
}

/// Per-vertex layout of a quad mesh. The stride is the sum of the attribute
/// widths; producers write vertices packed to this stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    attrs: Vec<VertexAttr>,
}

impl VertexLayout {
    pub fn new(attrs: impl Into<Vec<VertexAttr>>) -> Self {
        let attrs = attrs.into();
        assert!(!attrs.is_empty(), "a vertex layout needs attributes");
        assert!(
            attrs.iter().all(|a| a.bytes > 0),
            "zero-width vertex attribute"
        );
        Self { attrs }
    }

    pub fn attrs(&self) -> &[VertexAttr] {
        &self.attrs
    }

    /// Bytes per vertex.
    pub fn stride(&self) -> usize {
        self.attrs.iter().map(|a| a.bytes).sum()
    }
}
