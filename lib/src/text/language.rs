// Copyright 2024 The FlowGrid Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::Path;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LanguageId {
    #[default]
    None,
    Faust,
    Json,
}

pub struct Language {
    pub id: LanguageId,
    pub name: &'static str,
    pub file_extensions: &'static [&'static str],
    pub single_line_comment: Option<&'static str>,
}

static LANGUAGES: &[Language] = &[
    Language {
        id: LanguageId::None,
        name: "None",
        file_extensions: &[],
        single_line_comment: None,
    },
    Language {
        id: LanguageId::Faust,
        name: "Faust",
        file_extensions: &["dsp"],
        single_line_comment: Some("//"),
    },
    Language {
        id: LanguageId::Json,
        name: "JSON",
        file_extensions: &["json"],
        single_line_comment: None,
    },
];

pub fn language(id: LanguageId) -> &'static Language {
    LANGUAGES.iter().find(|language| language.id == id).unwrap()
}

pub fn language_for_path(path: &Path) -> LanguageId {
    let Some(extension) = path.extension().and_then(|extension| extension.to_str()) else {
        return LanguageId::None;
    };
    LANGUAGES
        .iter()
        .find(|language| language.file_extensions.contains(&extension))
        .map_or(LanguageId::None, |language| language.id)
}
