use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use ndarray::prelude::*;
use rayon::prelude::*;
use serde::Deserialize;

use crate::catalog::name_key;
use crate::error::{LoadError, NotFound};

#[derive(Deserialize)]
struct EmbeddingRow {
    name: String,
    embeddings: String,
}

/// 向量表中的一条记录
#[derive(Debug, Clone)]
pub struct EmbeddingEntry<'a> {
    pub name: &'a str,
    pub vector: ArrayView1<'a, f32>,
}

/// 卡牌名称到文本向量的只读映射
///
/// 所有向量保存在一个 `n × dim` 的矩阵中，行号即插入顺序。
#[derive(Debug)]
pub struct EmbeddingStore {
    names: Vec<String>,
    keys: Vec<String>,
    by_name: HashMap<String, usize>,
    vectors: Array2<f32>,
    norms: Array1<f32>,
}

/// 解析形如 `[0.1 0.2\n 0.3]` 的向量文本
pub fn parse_vector(s: &str) -> Result<Vec<f32>, String> {
    let vector = s
        .split(|c: char| c == '[' || c == ']' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<f32>().map_err(|e| format!("`{token}`: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    if vector.is_empty() {
        return Err("empty vector".to_string());
    }
    Ok(vector)
}

impl EmbeddingStore {
    /// 从 `(名称, 向量)` 构建向量表，所有向量必须维数一致
    pub fn from_entries<I>(entries: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        let mut names = vec![];
        let mut data = vec![];
        let mut dim = None;
        for (i, (name, vector)) in entries.into_iter().enumerate() {
            let expected = *dim.get_or_insert(vector.len());
            if vector.len() != expected {
                return Err(LoadError::DimensionMismatch {
                    row: i + 1,
                    name,
                    expected,
                    got: vector.len(),
                });
            }
            names.push(name);
            data.extend(vector);
        }

        let vectors = Array2::from_shape_vec((names.len(), dim.unwrap_or(0)), data)?;
        let norms = vectors.map_axis(Axis(1), |row| row.dot(&row).sqrt());
        let keys = names.iter().map(|name| name_key(name)).collect::<Vec<_>>();
        let mut by_name = HashMap::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            by_name.entry(key.clone()).or_insert(i);
        }

        Ok(Self { names, keys, by_name, vectors, norms })
    }

    /// 从带 `name,embeddings` 表头的 CSV 读取向量表
    ///
    /// 任意一行解析失败都会返回错误，不会跳过。
    /// 有多行出错时报告最靠前的一行。
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut reader = csv::Reader::from_reader(reader);
        let rows = reader.deserialize().collect::<Result<Vec<EmbeddingRow>, _>>()?;

        // 并行解析，按行号顺序收集结果
        let parsed = rows
            .into_par_iter()
            .map(|row| (parse_vector(&row.embeddings), row.name))
            .collect::<Vec<_>>();
        let entries = parsed
            .into_iter()
            .enumerate()
            .map(|(i, (vector, name))| match vector {
                Ok(vector) => Ok((name, vector)),
                Err(reason) => Err(LoadError::MalformedVector { row: i + 1, name, reason }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_entries(entries)
    }

    /// 从 CSV 文件读取向量表
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file =
            File::open(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
        Self::from_reader(file)
    }

    /// 按名称查找向量，忽略大小写，同名时返回第一条
    pub fn vector_for_name(&self, name: &str) -> Result<ArrayView1<'_, f32>, NotFound> {
        self.by_name
            .get(&name_key(name))
            .map(|&i| self.vectors.row(i))
            .ok_or_else(|| NotFound(name.to_string()))
    }

    /// 按插入顺序遍历所有记录
    pub fn all_entries(&self) -> impl Iterator<Item = EmbeddingEntry<'_>> {
        self.names
            .iter()
            .zip(self.vectors.outer_iter())
            .map(|(name, vector)| EmbeddingEntry { name, vector })
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub(crate) fn key(&self, index: usize) -> &str {
        &self.keys[index]
    }

    pub(crate) fn vectors(&self) -> ArrayView2<'_, f32> {
        self.vectors.view()
    }

    pub(crate) fn norms(&self) -> ArrayView1<'_, f32> {
        self.norms.view()
    }

    /// 向量维数，空表为 0
    pub fn dim(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case::numpy_repr("[ 0.5 -1.25\n  3.0e-2]", vec![0.5, -1.25, 0.03])]
    #[case::no_brackets("1 2 3", vec![1., 2., 3.])]
    #[case::tight_brackets("[1.0]", vec![1.])]
    fn test_parse_vector(#[case] input: &str, #[case] expected: Vec<f32>) {
        assert_eq!(parse_vector(input).unwrap(), expected);
    }

    #[rstest]
    #[case::garbage("[0.1 abc]")]
    #[case::comma("[0.1, 0.2]")]
    #[case::empty("[]")]
    fn test_parse_vector_malformed(#[case] input: &str) {
        assert!(parse_vector(input).is_err());
    }

    #[test]
    fn test_load_csv() {
        let csv = "name,embeddings\nBlack Lotus,\"[1.0 0.0\n 0.0]\"\nMox Sapphire,[0.0 1.0 0.0]\n";
        let store = EmbeddingStore::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.dim(), 3);
        assert_eq!(store.vector_for_name("mox sapphire").unwrap().to_vec(), vec![0., 1., 0.]);
        assert_eq!(store.vector_for_name("Opt"), Err(NotFound("Opt".to_string())));

        let names = store.all_entries().map(|entry| entry.name).collect::<Vec<_>>();
        assert_eq!(names, ["Black Lotus", "Mox Sapphire"]);
    }

    #[test]
    fn test_malformed_row_fails_load() {
        let csv = "name,embeddings\nBlack Lotus,[1.0 0.0]\nMox Sapphire,[0.0 oops]\n";
        let err = EmbeddingStore::from_reader(csv.as_bytes()).unwrap_err();
        match err {
            LoadError::MalformedVector { row, name, .. } => {
                assert_eq!(row, 2);
                assert_eq!(name, "Mox Sapphire");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_first_malformed_row_is_reported() {
        let mut csv = "name,embeddings\n".to_string();
        for i in 0..2000 {
            let vector = if i >= 3 && i % 7 == 3 { "[0.0 bad]" } else { "[1.0 0.0]" };
            csv.push_str(&format!("Card {i},{vector}\n"));
        }
        let err = EmbeddingStore::from_reader(csv.as_bytes()).unwrap_err();
        match err {
            LoadError::MalformedVector { row, name, .. } => {
                assert_eq!(row, 4);
                assert_eq!(name, "Card 3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_dimension_mismatch_fails_load() {
        let csv = "name,embeddings\nBlack Lotus,[1.0 0.0]\nMox Sapphire,[0.0 1.0 2.0]\n";
        assert!(matches!(
            EmbeddingStore::from_reader(csv.as_bytes()),
            Err(LoadError::DimensionMismatch { row: 2, expected: 2, got: 3, .. })
        ));
    }

    #[test]
    fn test_empty_store() {
        let store = EmbeddingStore::from_reader("name,embeddings\n".as_bytes()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dim(), 0);
        assert_eq!(store.all_entries().count(), 0);
    }

    #[test]
    fn test_missing_file() {
        let err = EmbeddingStore::open("/nonexistent/embeddings.csv").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
