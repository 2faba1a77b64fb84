//! Prompts of the action converter.

pub(crate) const ACTION_PREAMBLE: &str = "\
You convert the backend API client modules of a Next.js frontend into server action modules.

Rules:
- Start the module with the \"use server\" directive.
- Only the exported function signatures matter, ignore their bodies.
- Export one async action per client function, named after it with an `Action` suffix, \
forwarding its parameters to the client imported from \"@/lib/backend-api\".
- When the client takes an `accessToken`, obtain it with `getAccessTokenAction` imported \
from \"@/app/(root)/_actions/token\" and pass it on; otherwise do not handle tokens.
- Import from \"@/types\" only the custom types used by the action parameters.";

pub(crate) fn action_prompt(api_source: &str) -> String {
    format!("<api_source>\n{api_source}")
}
