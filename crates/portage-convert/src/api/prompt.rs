//! Prompts of the function converter.

use std::path::Path;

pub(crate) const API_PREAMBLE: &str = "\
You convert FastAPI endpoint functions of a Python backend into API client functions of a \
Next.js frontend written in TypeScript.

Input: the endpoint source (decorators, signature, docstring) and the path of the file to \
generate, always `lib/backend-api/<router>/<function>.ts`.

Rules:
- Export one `const` named after the function in camelCase, wrapped in React `cache`.
- The function takes a single destructured object: path parameters, query parameters, the \
request body and, when the endpoint depends on the current user, `accessToken`.
- Build the URL from `BACKEND_API_URL` (imported from `../config`), the router name (the \
router directory with `_` replaced by `-`) and the route of the decorator.
- Send `Authorization: Bearer ${accessToken}` when a token is taken and JSON bodies with \
`JSON.stringify`.
- Throw `UnexpectedError` (from `@/errors`) when the response is not ok, otherwise return \
`await response.json()` typed with the response model.
- Import every type used from `@/types`.
- Document the function with a JSDoc block describing parameters, errors and the result.
- Ignore framework-only parameters such as database sessions and background tasks.";

pub(crate) fn function_prompt(src_relpath: &Path, source: &str, dst_relpath: &Path) -> String {
    format!(
        "<src_filepath>\n{}\n\n<api_function_source>\n{source}\n\n<dst_filepath>\n{}",
        src_relpath.display(),
        dst_relpath.display()
    )
}
