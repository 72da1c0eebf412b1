//! Captures device errors raised while creating a resource.

/// Runs `create` inside an error scope and returns what it built together with
/// the first error of kind `filter` the device reported for it.
pub(crate) fn scoped<T>(
    device: &wgpu::Device,
    filter: wgpu::ErrorFilter,
    create: impl FnOnce() -> T,
) -> (T, Option<wgpu::Error>) {
    let scope = device.push_error_scope(filter);
    let value = create();
    let error = pollster::block_on(scope.pop());
    (value, error)
}

/// Formats the error messages a shader module produced while compiling.
pub(crate) fn compilation_errors(module: &wgpu::ShaderModule) -> Option<String> {
    let info = pollster::block_on(module.get_compilation_info());
    let errors: Vec<String> = info
        .messages
        .iter()
        .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
        .map(|m| match &m.location {
            Some(loc) => format!("{}:{}: {}", loc.line_number, loc.line_position, m.message),
            None => m.message.clone(),
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(errors.join("\n"))
    }
}
