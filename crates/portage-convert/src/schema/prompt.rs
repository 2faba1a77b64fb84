//! Prompts of the segment converter.

use std::path::Path;

pub(crate) const SEGMENT_PREAMBLE: &str = "\
You convert the data types of a Python backend into TypeScript types for its frontend.

Convert every pydantic model, enum (Enum, StrEnum, IntEnum) and typing.Literal alias of the \
given segment into exported TypeScript declarations.

Rules:
- Reply with an empty `converted_segment` when the segment declares no data type.
- Models become `export type Name = { ... };`, never interfaces or classes.
- A model extending another model becomes an intersection `Parent & { ... }`, unless the \
parent is the project base model.
- Enums become `export enum`; Literal aliases become string literal unions.
- dict fields become `Record<K, V>`; Optional fields are marked with `?`, never `| undefined`.
- Pydantic specific types (EmailStr, PositiveInt, ...) map to the matching TypeScript builtin.
- Keep generic parameters of generic models.
- Reuse every other type name as is; do not replace unknown types with any or Record.
- For request bodies (names ending in ReqBody), mark fields with defaults optional and add \
`// default to <value>` on the same line. Response models never use `?` for defaulted fields.
- Never emit import statements.";

pub(crate) fn segment_prompt(src_relpath: &Path, segment: &str) -> String {
    format!(
        "<src_file_relpath>\n{}\n\n<code_segment>\n{segment}",
        src_relpath.display()
    )
}
