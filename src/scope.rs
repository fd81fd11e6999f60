//! Protected names and module-level scope facts.
//!
//! A name is protected when something outside the module refers to it by its
//! exact spelling: the language itself, the host runtime, or a third-party
//! runtime object the bundle talks to.

use oxc_ast::ast::{BindingPattern, Declaration, Program};
use oxc_semantic::SemanticBuilder;
use std::collections::HashSet;

lazy_static::lazy_static! {
    /// Reserved and contextual keywords.
    pub static ref RESERVED_WORDS: HashSet<&'static str> = [
        "break", "case", "catch", "class", "const", "continue", "debugger", "default",
        "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
        "function", "if", "import", "in", "instanceof", "new", "null", "return", "super",
        "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with",
        "yield", "let", "static", "implements", "interface", "package", "private",
        "protected", "public", "await", "async", "of", "get", "set", "as", "from",
        "arguments", "eval", "constructor", "prototype", "__proto__", "undefined",
        "NaN", "Infinity", "declare", "type", "namespace", "module", "abstract",
        "readonly", "keyof", "infer", "is", "asserts", "unique", "satisfies",
    ]
    .into_iter()
    .collect();

    /// Host runtime globals (language built-ins, browser and server hosts).
    pub static ref RUNTIME_GLOBALS: HashSet<&'static str> = [
        // Language built-ins
        "Object", "Function", "Array", "String", "Number", "Boolean", "Symbol", "BigInt",
        "Math", "JSON", "Date", "RegExp", "Error", "TypeError", "RangeError",
        "SyntaxError", "ReferenceError", "EvalError", "URIError", "AggregateError",
        "Promise", "Map", "Set", "WeakMap", "WeakSet", "WeakRef", "Proxy", "Reflect",
        "ArrayBuffer", "SharedArrayBuffer", "DataView", "Int8Array", "Uint8Array",
        "Uint8ClampedArray", "Int16Array", "Uint16Array", "Int32Array", "Uint32Array",
        "Float32Array", "Float64Array", "BigInt64Array", "BigUint64Array", "Intl",
        "globalThis", "parseInt", "parseFloat", "isNaN", "isFinite", "encodeURI",
        "decodeURI", "encodeURIComponent", "decodeURIComponent", "queueMicrotask",
        "structuredClone",
        // Browser host
        "window", "self", "document", "navigator", "location", "history", "console",
        "localStorage", "sessionStorage", "fetch", "Request", "Response", "Headers",
        "URL", "URLSearchParams", "FormData", "Blob", "File", "FileReader", "Image",
        "Event", "CustomEvent", "EventTarget", "HTMLElement", "Element", "Node",
        "MutationObserver", "IntersectionObserver", "ResizeObserver", "WebSocket",
        "Worker", "XMLHttpRequest", "AbortController", "TextEncoder", "TextDecoder",
        "crypto", "performance", "alert", "confirm", "prompt", "atob", "btoa",
        "setTimeout", "clearTimeout", "setInterval", "clearInterval",
        "requestAnimationFrame", "cancelAnimationFrame", "requestIdleCallback",
        "getComputedStyle", "matchMedia", "indexedDB", "caches",
        // Server host
        "process", "require", "module", "exports", "global", "Buffer", "__dirname",
        "__filename", "setImmediate", "clearImmediate",
    ]
    .into_iter()
    .collect();

    /// Runtime objects supplied by third-party libraries the bundle is linked against.
    pub static ref FRAMEWORK_GLOBALS: HashSet<&'static str> = [
        // UI framework runtime
        "React", "ReactDOM", "useState", "useEffect", "useLayoutEffect", "useRef",
        "useMemo", "useCallback", "useContext", "useReducer", "useId", "useTransition",
        "useDeferredValue", "useSyncExternalStore", "useImperativeHandle",
        "useInsertionEffect", "useDebugValue", "createElement", "createContext",
        "forwardRef", "memo", "lazy", "Suspense", "Fragment", "StrictMode", "jsx",
        "jsxs", "jsxDEV", "createRoot", "hydrateRoot", "setState",
        // 3D graphics runtime
        "THREE", "WebGLRenderer", "Scene", "PerspectiveCamera", "OrthographicCamera",
        "Mesh", "Vector3", "Quaternion", "Color", "BufferGeometry", "Clock",
        "WebGLRenderingContext", "WebGL2RenderingContext",
        // Wallet / crypto runtime
        "ethereum", "ethers", "web3", "Web3", "solana", "phantom", "BigNumber",
        "Wallet", "Provider", "Contract",
    ]
    .into_iter()
    .collect();
}

/// True for names no profile can make renamable.
pub fn is_builtin_protected(name: &str) -> bool {
    RESERVED_WORDS.contains(name) || RUNTIME_GLOBALS.contains(name) || FRAMEWORK_GLOBALS.contains(name)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPE FACTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Names referenced by the module but bound nowhere inside it.
///
/// These resolve against the host's global object at runtime, so renaming
/// them would break the reference.
pub fn unresolved_references(program: &Program) -> HashSet<String> {
    let semantic_ret = SemanticBuilder::new()
        .with_check_syntax_error(false)
        .build(program);

    let scoping = semantic_ret.semantic.scoping();
    let mut names = HashSet::new();
    for (name, _) in scoping.root_unresolved_references() {
        names.insert(name.to_string());
    }
    names
}

/// Semantic errors (redeclarations, invalid assignment targets, ...) in a
/// program that already parsed.
pub fn semantic_errors(program: &Program) -> Vec<String> {
    let semantic_ret = SemanticBuilder::new()
        .with_check_syntax_error(true)
        .build(program);

    semantic_ret.errors.iter().map(|e| e.to_string()).collect()
}

/// Every name bound by a (possibly destructuring) pattern.
pub fn collect_binding_names(pattern: &BindingPattern, names: &mut Vec<String>) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => {
            names.push(id.name.to_string());
        }
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                collect_binding_names(&prop.value, names);
            }
            if let Some(rest) = &obj.rest {
                collect_binding_names(&rest.argument, names);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for elem in arr.elements.iter().flatten() {
                collect_binding_names(elem, names);
            }
            if let Some(rest) = &arr.rest {
                collect_binding_names(&rest.argument, names);
            }
        }
        BindingPattern::AssignmentPattern(assign) => {
            collect_binding_names(&assign.left, names);
        }
    }
}

/// Names introduced by a declaration.
pub fn declared_names(decl: &Declaration, names: &mut Vec<String>) {
    match decl {
        Declaration::VariableDeclaration(var) => {
            for d in &var.declarations {
                collect_binding_names(&d.id, names);
            }
        }
        Declaration::FunctionDeclaration(func) => {
            if let Some(id) = &func.id {
                names.push(id.name.to_string());
            }
        }
        Declaration::ClassDeclaration(class) => {
            if let Some(id) = &class.id {
                names.push(id.name.to_string());
            }
        }
        Declaration::TSTypeAliasDeclaration(decl) => names.push(decl.id.name.to_string()),
        Declaration::TSInterfaceDeclaration(decl) => names.push(decl.id.name.to_string()),
        Declaration::TSEnumDeclaration(decl) => names.push(decl.id.name.to_string()),
        Declaration::TSModuleDeclaration(decl) => {
            if let oxc_ast::ast::TSModuleDeclarationName::Identifier(id) = &decl.id {
                names.push(id.name.to_string());
            }
        }
        Declaration::TSImportEqualsDeclaration(decl) => names.push(decl.id.name.to_string()),
        #[allow(unreachable_patterns)]
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_program, Dialect};
    use oxc_allocator::Allocator;

    #[test]
    fn test_builtin_protection() {
        assert!(is_builtin_protected("useState"));
        assert!(is_builtin_protected("THREE"));
        assert!(is_builtin_protected("ethereum"));
        assert!(is_builtin_protected("constructor"));
        assert!(!is_builtin_protected("UserProfile"));
    }

    #[test]
    fn test_unresolved_references_are_free_names_only() {
        let allocator = Allocator::default();
        let code = "const total = 1; loadThing(total); function helper() { return analytics; }";
        let program = parse_program(&allocator, code, Dialect::default(), "t.js").unwrap();
        let free = unresolved_references(&program);
        assert!(free.contains("loadThing"));
        assert!(free.contains("analytics"));
        assert!(!free.contains("total"));
        assert!(!free.contains("helper"));
    }

    #[test]
    fn test_semantic_errors_catch_redeclaration() {
        let allocator = Allocator::default();
        let program =
            parse_program(&allocator, "let a0 = 1; let a0 = 2;", Dialect::default(), "t.js");
        // Some parser versions report this during parsing already.
        if let Ok(program) = program {
            assert!(!semantic_errors(&program).is_empty());
        }
    }

    #[test]
    fn test_collect_binding_names_destructuring() {
        let allocator = Allocator::default();
        let program = parse_program(
            &allocator,
            "const { alpha, beta: [gamma, ...delta], eps = 1, ...rest } = src;",
            Dialect::default(),
            "t.js",
        )
        .unwrap();
        let mut names = Vec::new();
        if let oxc_ast::ast::Statement::VariableDeclaration(var) = &program.body[0] {
            collect_binding_names(&var.declarations[0].id, &mut names);
        }
        assert_eq!(names, vec!["alpha", "gamma", "delta", "eps", "rest"]);
    }
}
