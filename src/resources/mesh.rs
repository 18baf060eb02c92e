use crate::data_structures::mesh::{MeshData, ModelVertex};

/**
 * Reads one glTF primitive into a triangle list.
 *
 * Primitives without indices get sequential ones and primitives without normals get
 * computed ones. Anything that is not a triangle list is skipped.
 */
pub fn read_primitive(
    mesh_name: &str,
    primitive: &gltf::Primitive,
    buffer_data: &[Vec<u8>],
) -> Option<MeshData> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!(
            "Primitive {} of mesh {} uses {:?} which is not supported.",
            primitive.index(),
            mesh_name,
            primitive.mode()
        );
        return None;
    }
    let reader = primitive.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));

    let mut vertices: Vec<ModelVertex> = match reader.read_positions() {
        Some(positions) => positions
            .map(|position| ModelVertex {
                position,
                ..Default::default()
            })
            .collect(),
        None => {
            log::warn!("Primitive {} of mesh {} has no positions.", primitive.index(), mesh_name);
            return None;
        }
    };

    let has_normals = match reader.read_normals() {
        Some(normals) => {
            vertices
                .iter_mut()
                .zip(normals)
                .for_each(|(vertex, normal)| vertex.normal = normal);
            true
        }
        None => false,
    };
    if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
        vertices
            .iter_mut()
            .zip(tex_coords)
            .for_each(|(vertex, tex_coord)| vertex.tex_coords = tex_coord);
    }

    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect::<Vec<u32>>(),
        None => (0..vertices.len() as u32).collect(),
    };

    let mut mesh = MeshData::new(mesh_name, vertices, indices);
    if !has_normals {
        mesh.compute_normals();
    }
    Some(mesh)
}
